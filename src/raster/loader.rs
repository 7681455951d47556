use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Decodes `path` and applies its EXIF orientation, so pixel coordinates
/// match what the OCR service sees.
pub fn load_oriented(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .with_guessed_format()?;
    decode_with_orientation(reader)
        .with_context(|| format!("failed to decode image {}", path.display()))
}

pub fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    decode_with_orientation(reader)
}

fn decode_with_orientation<R>(reader: ImageReader<R>) -> Result<DynamicImage>
where
    R: std::io::BufRead + std::io::Seek,
{
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Encodes as PNG or, for any other format, as JPEG at `jpeg_quality`.
pub fn encode(image: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        ImageFormat::Png => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?,
        _ => {
            let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality);
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        }
    }
    Ok(bytes)
}

/// Writes `image` in the format implied by the extension of `path`.
pub fn save(image: &DynamicImage, path: &Path, jpeg_quality: u8) -> Result<()> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Jpeg);
    let bytes = encode(image, format, jpeg_quality)?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn png_survives_encode_decode() {
        let mut img = RgbImage::new(4, 3);
        img.put_pixel(1, 2, Rgb([10, 20, 30]));
        let source = DynamicImage::ImageRgb8(img);

        let bytes = encode(&source, ImageFormat::Png, DEFAULT_JPEG_QUALITY).unwrap();
        let back = decode_oriented(&bytes).unwrap();
        assert_eq!(back.dimensions(), (4, 3));
        assert_eq!(back.to_rgb8().get_pixel(1, 2), &Rgb([10, 20, 30]));
    }

    #[test]
    fn jpeg_drops_alpha() {
        let source = DynamicImage::new_rgba8(8, 8);
        let bytes = encode(&source, ImageFormat::Jpeg, 80).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    /// JPEG with an APP1 Exif segment whose only IFD entry is
    /// Orientation (0x0112) = `orientation`.
    fn jpeg_with_orientation(source: &DynamicImage, orientation: u8) -> Vec<u8> {
        let jpeg = encode(source, ImageFormat::Jpeg, 95).unwrap();
        let tiff: [u8; 26] = [
            b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08, // header, IFD at 8
            0x00, 0x01, // one entry
            0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, // SHORT x1
            0x00, orientation, 0x00, 0x00, // value
            0x00, 0x00, 0x00, 0x00, // no next IFD
        ];
        let length = (2 + 6 + tiff.len()) as u16;

        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    fn is_red(pixel: &Rgb<u8>) -> bool {
        pixel[0] > 180 && pixel[2] < 80
    }

    fn is_blue(pixel: &Rgb<u8>) -> bool {
        pixel[2] > 180 && pixel[0] < 80
    }

    #[test]
    fn exif_rotation_is_applied() {
        // left half red, right half blue
        let img = RgbImage::from_fn(32, 16, |x, _| {
            if x < 16 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let bytes = jpeg_with_orientation(&DynamicImage::ImageRgb8(img), 6);

        let back = decode_oriented(&bytes).unwrap();
        assert_eq!(back.dimensions(), (16, 32));

        // rotated 90 degrees clockwise: the left half ends up on top
        let back = back.to_rgb8();
        assert!(is_red(back.get_pixel(8, 4)), "{:?}", back.get_pixel(8, 4));
        assert!(is_blue(back.get_pixel(8, 27)), "{:?}", back.get_pixel(8, 27));
    }

    #[test]
    fn missing_exif_keeps_jpeg_upright() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 5, Rgb([0, 0, 255])));
        let bytes = encode(&source, ImageFormat::Jpeg, 90).unwrap();
        assert_eq!(decode_oriented(&bytes).unwrap().dimensions(), (12, 5));
    }
}
