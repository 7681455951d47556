use image::{imageops, DynamicImage, GenericImage, GenericImageView, GrayImage, Luma, Rgba};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point as PixelPoint;

use crate::core::error::ExtractError;
use crate::core::geometry::{Polygon, Rect};

const MASK_ON: Luma<u8> = Luma([255]);

/// Cuts polygon-masked line images out of one source raster. The source is
/// only ever read, so one extractor can serve any number of lines.
#[derive(Debug, Clone, Copy)]
pub struct ImageExtractor<'a> {
    source: &'a DynamicImage,
}

impl<'a> ImageExtractor<'a> {
    pub fn new(source: &'a DynamicImage) -> Self {
        Self { source }
    }

    /// Crops `rect` out of the source and blanks every pixel outside
    /// `polygon`. The result is `rect`-sized even where `rect` leaves the
    /// image; uncovered pixels are background.
    pub fn extract(&self, polygon: &Polygon, rect: &Rect) -> Result<DynamicImage, ExtractError> {
        let (width, height) = (rect.width(), rect.height());
        if width == 0 || height == 0 {
            return Err(ExtractError::EmptyRegion((*rect).into()));
        }

        let mut crop = self.crop(rect);
        let mask = polygon_mask(polygon, rect)?;
        for (x, y, pixel) in mask.enumerate_pixels() {
            if pixel[0] == 0 {
                crop.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        Ok(crop)
    }

    fn crop(&self, rect: &Rect) -> DynamicImage {
        let (width, height) = self.source.dimensions();
        let inside = rect.min_x >= 0
            && rect.min_y >= 0
            && rect.max_x as i64 <= width as i64
            && rect.max_y as i64 <= height as i64;
        if inside {
            return self.source.crop_imm(
                rect.min_x as u32,
                rect.min_y as u32,
                rect.width(),
                rect.height(),
            );
        }

        let mut canvas = DynamicImage::new(rect.width(), rect.height(), self.source.color());
        imageops::replace(
            &mut canvas,
            self.source,
            -(rect.min_x as i64),
            -(rect.min_y as i64),
        );
        canvas
    }
}

/// Single-channel mask the size of `rect` with `polygon` filled opaque, in
/// coordinates local to the rectangle's origin.
pub fn polygon_mask(polygon: &Polygon, rect: &Rect) -> Result<GrayImage, ExtractError> {
    let vertices = polygon.vertices();
    if vertices.len() < 3 {
        return Err(ExtractError::PolygonTooSmall(vertices.len()));
    }

    let origin = rect.origin();
    let local: Vec<PixelPoint<i32>> = vertices
        .iter()
        .map(|p| p.translated(origin.x.saturating_neg(), origin.y.saturating_neg()))
        .map(|p| PixelPoint::new(p.x, p.y))
        .collect();

    let mut mask = GrayImage::new(rect.width(), rect.height());
    draw_polygon_mut(&mut mask, &local, MASK_ON);
    Ok(mask)
}
