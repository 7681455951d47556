use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, warn};

use crate::core::model::ProcessedImage;
use crate::export::Exporter;
use crate::raster::extract::ImageExtractor;
use crate::raster::loader;

/// Writes one masked crop per line (`<stem>-l<i>.jpg`) and the transcript
/// index `<stem>.txt` into `<out_dir>/<stem>/`.
#[derive(Debug, Clone)]
pub struct DatasetExporter {
    out_dir: PathBuf,
    jpeg_quality: u8,
}

impl DatasetExporter {
    pub fn new(out_dir: PathBuf, jpeg_quality: u8) -> Self {
        Self {
            out_dir,
            jpeg_quality,
        }
    }
}

impl Exporter for DatasetExporter {
    fn export(&self, document: &ProcessedImage) -> Result<()> {
        let stem = &document.stem;
        let dir = self.out_dir.join(stem);
        fs::create_dir_all(&dir)?;

        let extractor = ImageExtractor::new(&document.image);
        let mut index = String::new();
        let pairs = document
            .lines
            .hull_lines
            .iter()
            .zip(&document.lines.rect_lines);

        for (i, (hull, rect_line)) in pairs.enumerate() {
            let file_name = format!("{stem}-l{i}.jpg");
            let rect = rect_line.shape.bounds()?;
            match extractor.extract(&hull.shape.outline(), &rect) {
                Ok(crop) => {
                    loader::save(&crop, &dir.join(&file_name), self.jpeg_quality)?;
                    writeln!(index, "{file_name} {}", rect_line.text)?;
                }
                Err(err) => warn!(line = i, text = %rect_line.text, "skipping line: {err}"),
            }
        }

        fs::write(dir.join(format!("{stem}.txt")), index)?;
        debug!(stem, lines = document.lines.len(), "wrote dataset");
        Ok(())
    }
}
