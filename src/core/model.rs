use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::core::geometry::{BoundingBox, Shape};
use crate::ocr::annotation::AnnotateImageResponse;

/// One reconstructed line of running text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub word_boxes: Vec<BoundingBox>,
    pub shape: Shape,
}

impl Line {
    pub fn record(&self) -> LineRecord {
        LineRecord {
            text: self.text.clone(),
            vertices: self.shape.clone(),
        }
    }
}

/// Persisted form of a [`Line`]: `{"text": .., "vertices": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    pub text: String,
    pub vertices: Shape,
}

impl From<&Line> for LineRecord {
    fn from(line: &Line) -> Self {
        line.record()
    }
}

/// Both geometry renditions of the lines of one image, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct DocumentLines {
    pub hull_lines: Vec<Line>,
    pub rect_lines: Vec<Line>,
}

impl DocumentLines {
    pub fn len(&self) -> usize {
        self.rect_lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rect_lines.is_empty()
    }

    pub fn hull_records(&self) -> Vec<LineRecord> {
        self.hull_lines.iter().map(LineRecord::from).collect()
    }

    pub fn rect_records(&self) -> Vec<LineRecord> {
        self.rect_lines.iter().map(LineRecord::from).collect()
    }
}

/// One source image after annotation and line reconstruction.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub stem: String,
    pub image: DynamicImage,
    /// The OCR response exactly as received, for persistence.
    pub response: serde_json::Value,
    pub annotation: AnnotateImageResponse,
    pub lines: DocumentLines,
    pub dropped: Vec<String>,
    pub hull_fallbacks: usize,
}
