pub mod annotation;
pub mod bridge;
pub mod layout_builder;

pub use annotation::{AnnotateImageResponse, BreakType, FeatureLevel, TextAnnotation};
pub use bridge::{OcrClient, VisionClient, VisionConfig};
pub use layout_builder::{LineReconstructor, ReconstructOptions, Reconstruction};
