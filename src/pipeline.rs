use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageFormat;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::core::error::LineError;
use crate::core::geometry::{HullStrategy, RectStrategy, Shape, ShapeStrategy};
use crate::core::model::{DocumentLines, Line, ProcessedImage};
use crate::export::{DatasetExporter, Exporter, JsonExporter, OverlayExporter};
use crate::ocr::annotation::{AnnotateImageResponse, FeatureLevel, TextAnnotation};
use crate::ocr::bridge::{OcrClient, VisionClient, VisionConfig};
use crate::ocr::layout_builder::{LineReconstructor, ReconstructOptions};
use crate::raster::loader::{self, DEFAULT_JPEG_QUALITY};

/// Where the annotation tree of an image comes from.
#[derive(Debug, Clone)]
pub enum AnnotationSource {
    /// A saved `*_gcv_response.json`.
    File(PathBuf),
    Vision(VisionConfig),
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source: AnnotationSource,
    pub alpha: Option<f64>,
    pub flush_trailing: bool,
    pub overlay_levels: Vec<FeatureLevel>,
    pub draw_rects: bool,
    pub jpeg_quality: u8,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: PathBuf, source: AnnotationSource) -> Self {
        Self {
            input,
            output,
            source,
            alpha: None,
            flush_trailing: false,
            overlay_levels: Vec::new(),
            draw_rects: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_alpha(mut self, alpha: Option<f64>) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_flush_trailing(mut self, flush_trailing: bool) -> Self {
        self.flush_trailing = flush_trailing;
        self
    }

    pub fn with_overlay(mut self, levels: Vec<FeatureLevel>, draw_rects: bool) -> Self {
        self.overlay_levels = levels;
        self.draw_rects = draw_rects;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    fn reconstruct_options(&self) -> ReconstructOptions {
        ReconstructOptions {
            flush_trailing: self.flush_trailing,
        }
    }
}

pub fn stem_of(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .with_context(|| format!("no file stem in {}", path.display()))
}

/// Lines of an annotation in both geometries.
#[derive(Debug, Clone, Default)]
pub struct BuiltLines {
    pub lines: DocumentLines,
    pub dropped: Vec<String>,
    /// Lines whose hull could not be built and carry their rect polygon.
    pub hull_fallbacks: usize,
}

/// Reconstructs lines once with rect bounds, then derives each line's hull
/// from the same word boxes so both renditions stay index-aligned.
pub fn build_lines(
    annotation: &TextAnnotation,
    alpha: Option<f64>,
    options: ReconstructOptions,
) -> Result<BuiltLines, LineError> {
    let reconstruction = LineReconstructor::new(RectStrategy)
        .with_options(options)
        .reconstruct(annotation)?;

    let hull = HullStrategy::new(alpha);
    let mut hull_fallbacks = 0;
    let hull_lines = reconstruction
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let shape = match hull.build_from_boxes(&line.word_boxes) {
                Ok(shape) => shape,
                Err(err) => {
                    warn!(line = i, text = %line.text, "hull failed, using rect: {err}");
                    hull_fallbacks += 1;
                    Shape::Polygon(line.shape.outline())
                }
            };
            Line {
                text: line.text.clone(),
                word_boxes: line.word_boxes.clone(),
                shape,
            }
        })
        .collect();

    Ok(BuiltLines {
        lines: DocumentLines {
            hull_lines,
            rect_lines: reconstruction.lines,
        },
        dropped: reconstruction.dropped,
        hull_fallbacks,
    })
}

pub fn load_response(path: &Path) -> Result<serde_json::Value> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

/// Loads the image, obtains its annotation from the configured source and
/// reconstructs its lines.
pub fn process_image(config: &PipelineConfig) -> Result<ProcessedImage> {
    match &config.source {
        AnnotationSource::File(path) => {
            let response = load_response(path)?;
            process_image_with(config, |_| Ok(response))
        }
        AnnotationSource::Vision(vision) => {
            let client = VisionClient::new(vision.clone())?;
            process_image_with(config, |image| client.annotate(image))
        }
    }
}

/// [`process_image`] against any OCR collaborator.
pub fn process_image_with_client(
    config: &PipelineConfig,
    client: &dyn OcrClient,
) -> Result<ProcessedImage> {
    process_image_with(config, |image| client.annotate(image))
}

fn process_image_with<F>(config: &PipelineConfig, annotate: F) -> Result<ProcessedImage>
where
    F: FnOnce(&[u8]) -> Result<serde_json::Value>,
{
    let stem = stem_of(&config.input)?;
    let image = loader::load_oriented(&config.input)?;

    // OCR sees the upright image so its coordinates match the crops.
    let encoded = loader::encode(&image, ImageFormat::Png, config.jpeg_quality)?;
    let response = annotate(&encoded)?;
    let annotation = AnnotateImageResponse::from_value(response.clone())
        .context("OCR response does not match the annotation schema")?;

    let built = build_lines(
        annotation.annotation()?,
        config.alpha,
        config.reconstruct_options(),
    )
    .with_context(|| format!("failed to reconstruct lines of {}", config.input.display()))?;

    info!(
        stem,
        lines = built.lines.len(),
        dropped = built.dropped.len(),
        hull_fallbacks = built.hull_fallbacks,
        "processed image"
    );

    Ok(ProcessedImage {
        stem,
        image,
        response,
        annotation,
        lines: built.lines,
        dropped: built.dropped,
        hull_fallbacks: built.hull_fallbacks,
    })
}

pub fn export_dataset(document: &ProcessedImage, config: &PipelineConfig) -> Result<()> {
    let output = config.output.clone();

    JsonExporter::new(output.clone()).export(document)?;
    DatasetExporter::new(output.clone(), config.jpeg_quality).export(document)?;
    OverlayExporter::new(output, config.jpeg_quality)
        .with_feature_levels(config.overlay_levels.clone())
        .with_rects(config.draw_rects)
        .export(document)?;

    Ok(())
}

pub fn run(config: &PipelineConfig) -> Result<ProcessedImage> {
    let document = process_image(config)
        .with_context(|| format!("failed to process image: {}", config.input.display()))?;
    export_dataset(&document, config)
        .with_context(|| format!("failed to export to: {}", config.output.display()))?;
    Ok(document)
}

/// Outcome of one image in a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub input: PathBuf,
    pub result: Result<usize>,
}

/// Runs every config on a pool of `jobs` threads (0 = rayon default).
/// Results keep input order.
pub fn run_batch(configs: &[PipelineConfig], jobs: usize) -> Result<Vec<BatchItem>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("failed to build worker pool")?;

    Ok(pool.install(|| {
        configs
            .par_iter()
            .map(|config| BatchItem {
                input: config.input.clone(),
                result: run(config).map(|document| document.lines.len()),
            })
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use crate::core::geometry::Rect;

    fn temp_output_dir(prefix: &str) -> PathBuf {
        let mut out = std::env::temp_dir();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let pid = std::process::id();
        out.push(format!("{prefix}-{pid}-{now}"));
        out
    }

    fn symbol(text: &str, x: i32, y: i32, brk: Option<&str>) -> Value {
        let mut s = json!({
            "text": text,
            "boundingBox": {"vertices": [
                {"x": x, "y": y}, {"x": x + 10, "y": y},
                {"x": x + 10, "y": y + 20}, {"x": x, "y": y + 20}
            ]}
        });
        if let Some(brk) = brk {
            s["property"] = json!({"detectedBreak": {"type": brk}});
        }
        s
    }

    fn word(symbols: Vec<Value>, x0: i32, x1: i32, y: i32) -> Value {
        json!({
            "boundingBox": {"vertices": [
                {"x": x0, "y": y}, {"x": x1, "y": y},
                {"x": x1, "y": y + 20}, {"x": x0, "y": y + 20}
            ]},
            "symbols": symbols
        })
    }

    fn two_line_response() -> Value {
        let line1 = vec![
            word(vec![symbol("a", 10, 10, None), symbol("b", 20, 10, Some("SPACE"))], 10, 30, 10),
            word(vec![symbol("c", 40, 10, Some("LINE_BREAK"))], 40, 50, 10),
        ];
        let line2 = vec![word(
            vec![symbol("d", 10, 50, None), symbol("e", 20, 50, Some("EOL_SURE_SPACE"))],
            10,
            30,
            50,
        )];
        let words: Vec<Value> = line1.into_iter().chain(line2).collect();
        json!({
            "fullTextAnnotation": {
                "text": "ab c\nde\n",
                "pages": [{"width": 80, "height": 80, "blocks": [{
                    "paragraphs": [{"words": words}]
                }]}]
            }
        })
    }

    struct FakeOcr(Value);

    impl OcrClient for FakeOcr {
        fn annotate(&self, image: &[u8]) -> Result<Value> {
            assert!(!image.is_empty());
            Ok(self.0.clone())
        }
    }

    #[test]
    fn build_lines_keeps_renditions_aligned() {
        let response = AnnotateImageResponse::from_value(two_line_response()).unwrap();
        let built = build_lines(
            response.annotation().unwrap(),
            None,
            ReconstructOptions::default(),
        )
        .unwrap();

        let texts: Vec<&str> = built.lines.rect_lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["ab c", "de "]);
        assert_eq!(built.lines.hull_lines.len(), 2);
        assert_eq!(built.lines.rect_lines[0].shape, Shape::Rect(Rect::new(10, 10, 50, 30)));
        assert!(matches!(built.lines.hull_lines[0].shape, Shape::Polygon(_)));
        assert_eq!(built.hull_fallbacks, 0);
    }

    #[test]
    fn degenerate_hull_falls_back_to_rect_polygon() {
        // A zero-height word box: every point collinear.
        let response = json!({"fullTextAnnotation": {"pages": [{"blocks": [{"paragraphs": [{
            "words": [{
                "boundingBox": {"vertices": [{"x": 0, "y": 5}, {"x": 30, "y": 5}]},
                "symbols": [{"text": "x", "property": {"detectedBreak": {"type": 5}}}]
            }]
        }]}]}]}});
        let response = AnnotateImageResponse::from_value(response).unwrap();
        let built = build_lines(
            response.annotation().unwrap(),
            None,
            ReconstructOptions::default(),
        )
        .unwrap();

        assert_eq!(built.hull_fallbacks, 1);
        assert_eq!(
            built.lines.hull_lines[0].shape,
            Shape::Polygon(Rect::new(0, 5, 30, 5).to_polygon())
        );
    }

    #[test]
    fn process_and_export_with_fake_client() -> Result<()> {
        let output = temp_output_dir("ocrlines-pipeline");
        fs::create_dir_all(&output)?;
        let input = output.join("page.png");
        RgbImage::from_pixel(80, 80, Rgb([200, 200, 200])).save(&input)?;

        let config = PipelineConfig::new(
            input,
            output.clone(),
            AnnotationSource::File(PathBuf::new()),
        );
        let document = process_image_with_client(&config, &FakeOcr(two_line_response()))?;
        assert_eq!(document.stem, "page");
        assert_eq!(document.lines.len(), 2);

        export_dataset(&document, &config)?;
        let dir = output.join("page");
        assert!(dir.join("page_gcv_response.json").exists());
        assert!(dir.join("page_concave_hulls.json").exists());
        assert!(dir.join("page_rect_bounds.json").exists());
        assert!(dir.join("page-l0.jpg").exists());
        assert!(dir.join("page-l1.jpg").exists());
        assert!(output.join("page_lines_annotated.jpg").exists());
        assert_eq!(
            fs::read_to_string(dir.join("page.txt"))?,
            "page-l0.jpg ab c\npage-l1.jpg de \n"
        );

        let _ = fs::remove_dir_all(&output);
        Ok(())
    }

    #[test]
    fn missing_annotation_file_is_reported() {
        let config = PipelineConfig::new(
            PathBuf::from("page.png"),
            PathBuf::from("out"),
            AnnotationSource::File(PathBuf::from("/nonexistent/page_gcv_response.json")),
        );
        let err = process_image(&config).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
