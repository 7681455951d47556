use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::model::{LineRecord, ProcessedImage};
use crate::export::Exporter;

/// Writes the raw OCR response and both line geometries of an image into
/// `<out_dir>/<stem>/`.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn response_path(&self, stem: &str) -> PathBuf {
        self.out_dir
            .join(stem)
            .join(format!("{stem}_gcv_response.json"))
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<LineRecord>> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

impl Exporter for JsonExporter {
    fn export(&self, document: &ProcessedImage) -> Result<()> {
        let stem = &document.stem;
        let dir = self.out_dir.join(stem);
        fs::create_dir_all(&dir)?;

        write_json(&self.response_path(stem), &document.response)?;
        write_json(
            &dir.join(format!("{stem}_concave_hulls.json")),
            &document.lines.hull_records(),
        )?;
        write_json(
            &dir.join(format!("{stem}_rect_bounds.json")),
            &document.lines.rect_records(),
        )?;
        Ok(())
    }
}
