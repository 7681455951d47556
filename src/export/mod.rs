pub mod dataset_export;
pub mod json_export;
pub mod overlay_export;

use anyhow::Result;

use crate::core::model::ProcessedImage;

pub use dataset_export::DatasetExporter;
pub use json_export::JsonExporter;
pub use overlay_export::OverlayExporter;

pub trait Exporter {
    fn export(&self, document: &ProcessedImage) -> Result<()>;
}
