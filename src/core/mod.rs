pub mod alpha_shape;
pub mod error;
pub mod geometry;
pub mod model;
