pub mod core;
pub mod export;
pub mod ocr;
pub mod pipeline;
pub mod raster;

pub use crate::core::model::{DocumentLines, Line, LineRecord, ProcessedImage};
