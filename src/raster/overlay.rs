use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_polygon_mut, draw_hollow_rect_mut};
use imageproc::point::Point as PixelPoint;
use imageproc::rect::Rect as PixelRect;

use crate::core::error::StructureError;
use crate::core::geometry::{BoundingBox, Polygon, Rect};
use crate::ocr::annotation::{FeatureLevel, TextAnnotation};

pub const LINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

pub fn feature_color(level: FeatureLevel) -> Rgb<u8> {
    match level {
        FeatureLevel::Page => Rgb([0, 0, 255]),
        FeatureLevel::Block => Rgb([0, 128, 0]),
        FeatureLevel::Paragraph => Rgb([255, 255, 0]),
        FeatureLevel::Word => Rgb([255, 0, 0]),
        FeatureLevel::Symbol => Rgb([0, 0, 0]),
    }
}

/// Copy of `source` with every polygon outlined, for visual QA.
pub fn overlay_polygons(source: &DynamicImage, polygons: &[Polygon], color: Rgb<u8>) -> RgbImage {
    let mut canvas = source.to_rgb8();
    draw_polygons_mut(&mut canvas, polygons, color);
    canvas
}

pub fn draw_polygons_mut(canvas: &mut RgbImage, polygons: &[Polygon], color: Rgb<u8>) {
    for polygon in polygons {
        let vertices: Vec<PixelPoint<f32>> = polygon
            .vertices()
            .iter()
            .map(|p| PixelPoint::new(p.x as f32, p.y as f32))
            .collect();
        if vertices.len() >= 2 {
            draw_hollow_polygon_mut(canvas, &vertices, color);
        }
    }
}

pub fn draw_rects_mut(canvas: &mut RgbImage, rects: &[Rect], color: Rgb<u8>) {
    for rect in rects {
        let outline = PixelRect::at(rect.min_x, rect.min_y)
            .of_size(rect.width().max(1), rect.height().max(1));
        draw_hollow_rect_mut(canvas, outline, color);
    }
}

/// Outlines the box of every node at each of `levels`, one colour per level.
pub fn draw_feature_bounds_mut(
    canvas: &mut RgbImage,
    annotation: &TextAnnotation,
    levels: &[FeatureLevel],
) -> Result<(), StructureError> {
    for &level in levels {
        let polygons: Vec<Polygon> = annotation
            .feature_bounds(level)?
            .into_iter()
            .filter(|b: &BoundingBox| !b.is_empty())
            .map(|b| Polygon::closed(b.vertices))
            .collect();
        draw_polygons_mut(canvas, &polygons, feature_color(level));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Point;
    use pretty_assertions::assert_eq;

    #[test]
    fn outlines_without_filling() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 30, Rgb([255, 255, 255])));
        let square = Rect::new(5, 5, 20, 20).to_polygon();
        let out = overlay_polygons(&source, &[square], LINE_COLOR);

        assert_eq!(out.get_pixel(5, 5), &LINE_COLOR);
        assert_eq!(out.get_pixel(12, 5), &LINE_COLOR);
        assert_eq!(out.get_pixel(12, 12), &Rgb([255, 255, 255]));
        assert_eq!(source.to_rgb8().get_pixel(5, 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn rect_outline_covers_corners() {
        let mut canvas = RgbImage::new(20, 20);
        draw_rects_mut(&mut canvas, &[Rect::new(2, 3, 10, 12)], LINE_COLOR);
        assert_eq!(canvas.get_pixel(2, 3), &LINE_COLOR);
        assert_eq!(canvas.get_pixel(11, 14), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(5, 6), &Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_polygons_are_skipped() {
        let mut canvas = RgbImage::new(5, 5);
        draw_polygons_mut(&mut canvas, &[Polygon::closed(vec![Point::new(1, 1)])], LINE_COLOR);
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn collapsed_feature_boxes_do_not_panic() {
        let response: crate::ocr::annotation::AnnotateImageResponse =
            serde_json::from_value(serde_json::json!({"fullTextAnnotation": {"pages": [{
                "blocks": [{
                    "boundingBox": {"vertices": [{}, {}, {}, {}]},
                    "paragraphs": [{
                        "boundingBox": {"vertices": [
                            {"x": 1, "y": 1}, {"x": 5, "y": 1}, {"x": 1, "y": 1}, {"x": 1, "y": 1}
                        ]},
                        "words": []
                    }]
                }]
            }]}}))
            .unwrap();
        let mut canvas = RgbImage::new(8, 8);
        draw_feature_bounds_mut(
            &mut canvas,
            response.annotation().unwrap(),
            &[FeatureLevel::Block, FeatureLevel::Paragraph],
        )
        .unwrap();

        assert_eq!(canvas.get_pixel(3, 1), &feature_color(FeatureLevel::Paragraph));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }
}
