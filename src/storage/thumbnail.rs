//! Thumbnail generation
//!
//! A pure function from bytes + MIME type to an optional JPEG. Images
//! are downscaled to fit a square edge; audio gets a solid placeholder
//! tile; everything else yields none. Failures never propagate: an
//! upload without a thumbnail is still a successful upload.

use image::{Rgb, RgbImage};

/// Longest edge of a generated thumbnail
pub const THUMBNAIL_EDGE: u32 = 400;

/// Placeholder tile color for audio files
const AUDIO_PLACEHOLDER: Rgb<u8> = Rgb([44, 62, 80]);

/// Generate a JPEG thumbnail for the given bytes, or none
pub fn generate(data: &[u8], mime_type: &str) -> Option<Vec<u8>> {
    if mime_type.starts_with("image/") {
        let img = image::load_from_memory(data).ok()?;
        let thumb = img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE);
        encode_jpeg(&thumb.to_rgb8(), 85)
    } else if mime_type.starts_with("audio/") {
        let tile = RgbImage::from_pixel(THUMBNAIL_EDGE, THUMBNAIL_EDGE, AUDIO_PLACEHOLDER);
        encode_jpeg(&tile, 80)
    } else {
        // No decode stack for video frames; the soft-failure policy
        // means these simply ship without a preview.
        None
    }
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(img).ok()?;
    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn image_bytes_produce_a_jpeg_thumbnail() {
        let thumb = generate(&png_bytes(), "image/png").expect("thumbnail");
        let decoded = image::load_from_memory(&thumb).expect("valid jpeg");
        assert!(decoded.width() <= THUMBNAIL_EDGE);
        assert!(decoded.height() <= THUMBNAIL_EDGE);
    }

    #[test]
    fn audio_gets_a_placeholder_tile() {
        let thumb = generate(b"not image data", "audio/mpeg").expect("placeholder");
        let decoded = image::load_from_memory(&thumb).expect("valid jpeg");
        assert_eq!(decoded.width(), THUMBNAIL_EDGE);
        assert_eq!(decoded.height(), THUMBNAIL_EDGE);
    }

    #[test]
    fn video_and_garbage_yield_none() {
        assert!(generate(b"whatever", "video/mp4").is_none());
        assert!(generate(b"definitely not a png", "image/png").is_none());
        assert!(generate(b"", "application/pdf").is_none());
    }
}
