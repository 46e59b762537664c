//! Vertical stitching of captured viewport segments

use crate::SnagError;
use image::{imageops, ImageFormat, RgbaImage};
use std::io::Cursor;

/// One decoded viewport capture and the scroll offset it was taken at.
#[derive(Debug, Clone)]
pub struct Segment {
    pub offset_y: u32,
    pub image: RgbaImage,
}

impl Segment {
    pub fn decode(offset_y: u32, png: &[u8]) -> Result<Self, SnagError> {
        let image = image::load_from_memory(png)
            .map_err(|e| SnagError::CaptureFailed(format!("undecodable capture: {e}")))?
            .to_rgba8();

        Ok(Self { offset_y, image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Draw every segment onto one canvas, top to bottom, each at the sum of the
/// heights before it.
///
/// The canvas takes the first segment's width. With `enforce_equal_widths`
/// any other width is a [`SnagError::DimensionMismatch`]; without it, wider
/// segments are clipped on the right and narrower ones leave a transparent gap.
pub fn stitch(segments: &[Segment], enforce_equal_widths: bool) -> Result<RgbaImage, SnagError> {
    let first = segments.first().ok_or(SnagError::CaptureEmpty)?;
    let width = first.width();

    if enforce_equal_widths {
        if let Some((index, segment)) = segments
            .iter()
            .enumerate()
            .find(|(_, s)| s.width() != width)
        {
            return Err(SnagError::DimensionMismatch {
                index,
                expected: width,
                actual: segment.width(),
            });
        }
    }

    let total: u64 = segments.iter().map(|s| s.height() as u64).sum();
    let height = u32::try_from(total).map_err(|_| {
        SnagError::ImageError(format!("composite height {total} exceeds u32"))
    })?;

    let mut canvas = RgbaImage::new(width, height);
    let mut offset_y: i64 = 0;
    for segment in segments {
        imageops::replace(&mut canvas, &segment.image, 0, offset_y);
        offset_y += segment.height() as i64;
    }

    Ok(canvas)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SnagError> {
    let mut png_data = Vec::new();
    image.write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)?;
    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(offset_y: u32, width: u32, height: u32, shade: u8) -> Segment {
        Segment {
            offset_y,
            image: RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255])),
        }
    }

    #[test]
    fn test_dimensions_are_summed() {
        let segments = vec![solid(0, 40, 100, 10), solid(100, 40, 100, 20), solid(200, 40, 50, 30)];
        let composite = stitch(&segments, true).unwrap();
        assert_eq!(composite.width(), 40);
        assert_eq!(composite.height(), 250);
    }

    #[test]
    fn test_segments_drawn_at_cumulative_offsets() {
        let segments = vec![solid(0, 4, 3, 10), solid(3, 4, 2, 20), solid(6, 4, 3, 30)];
        let composite = stitch(&segments, true).unwrap();

        assert_eq!(composite.get_pixel(0, 0)[0], 10);
        assert_eq!(composite.get_pixel(3, 2)[0], 10);
        assert_eq!(composite.get_pixel(0, 3)[0], 20);
        assert_eq!(composite.get_pixel(0, 4)[0], 20);
        assert_eq!(composite.get_pixel(0, 5)[0], 30);
        assert_eq!(composite.get_pixel(3, 7)[0], 30);
    }

    #[test]
    fn test_empty_is_capture_empty() {
        assert!(matches!(stitch(&[], true), Err(SnagError::CaptureEmpty)));
    }

    #[test]
    fn test_width_mismatch() {
        let segments = vec![solid(0, 40, 10, 0), solid(10, 39, 10, 0)];
        match stitch(&segments, true) {
            Err(SnagError::DimensionMismatch {
                index,
                expected,
                actual,
            }) => {
                assert_eq!((index, expected, actual), (1, 40, 39));
            }
            other => panic!("expected dimension mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_width_mismatch_tolerated_when_not_enforced() {
        let segments = vec![solid(0, 40, 10, 50), solid(10, 60, 10, 60)];
        let composite = stitch(&segments, false).unwrap();
        assert_eq!(composite.dimensions(), (40, 20));
        assert_eq!(composite.get_pixel(39, 19)[0], 60);
    }

    #[test]
    fn test_encode_then_decode_segment() {
        let composite = stitch(&[solid(0, 8, 6, 77)], true).unwrap();
        let png = encode_png(&composite).unwrap();
        let segment = Segment::decode(0, &png).unwrap();
        assert_eq!((segment.width(), segment.height()), (8, 6));
        assert_eq!(segment.image.get_pixel(4, 4)[0], 77);
    }
}
