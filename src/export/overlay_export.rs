use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use image::DynamicImage;

use crate::core::geometry::{Polygon, Rect};
use crate::core::model::ProcessedImage;
use crate::export::Exporter;
use crate::ocr::annotation::FeatureLevel;
use crate::raster::loader;
use crate::raster::overlay::{self, LINE_COLOR};

/// Writes `<out_dir>/<stem>_lines_annotated.jpg`: the source image with
/// every line polygon outlined, plus optional rect bounds and feature boxes.
#[derive(Debug, Clone)]
pub struct OverlayExporter {
    out_dir: PathBuf,
    jpeg_quality: u8,
    feature_levels: Vec<FeatureLevel>,
    draw_rects: bool,
}

impl OverlayExporter {
    pub fn new(out_dir: PathBuf, jpeg_quality: u8) -> Self {
        Self {
            out_dir,
            jpeg_quality,
            feature_levels: Vec::new(),
            draw_rects: false,
        }
    }

    pub fn with_feature_levels(mut self, levels: Vec<FeatureLevel>) -> Self {
        self.feature_levels = levels;
        self
    }

    pub fn with_rects(mut self, draw_rects: bool) -> Self {
        self.draw_rects = draw_rects;
        self
    }
}

impl Exporter for OverlayExporter {
    fn export(&self, document: &ProcessedImage) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let polygons: Vec<Polygon> = document
            .lines
            .hull_lines
            .iter()
            .map(|line| line.shape.outline())
            .collect();
        let mut canvas = overlay::overlay_polygons(&document.image, &polygons, LINE_COLOR);

        if self.draw_rects {
            let rects = document
                .lines
                .rect_lines
                .iter()
                .map(|line| line.shape.bounds())
                .collect::<Result<Vec<Rect>, _>>()?;
            let color = overlay::feature_color(FeatureLevel::Page);
            overlay::draw_rects_mut(&mut canvas, &rects, color);
        }
        if !self.feature_levels.is_empty() {
            overlay::draw_feature_bounds_mut(
                &mut canvas,
                document.annotation.annotation()?,
                &self.feature_levels,
            )?;
        }

        let path = self
            .out_dir
            .join(format!("{}_lines_annotated.jpg", document.stem));
        loader::save(&DynamicImage::ImageRgb8(canvas), &path, self.jpeg_quality)
    }
}
