// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns an image file into the network's input layout:
//
//   1. Decode as 8-bit RGB
//   2. Reverse channel order (RGB → BGR)
//   3. Subtract the per-channel mean of the pretrained model
//   4. Lay out as (1, H, W, 3)
//
// H and W come straight from the file; nothing is resized.

use image::RgbImage;
use std::path::Path;

use crate::domain::error::{Result, SegError};
use crate::domain::sample::ImageArray;

/// Per-channel mean in BGR order, as used when the pretrained
/// classifier was trained.
pub const MEAN_BGR: [f64; 3] = [104.00698793, 116.66876762, 122.67891434];

/// Read an image file and preprocess it.
pub fn build_image(path: impl AsRef<Path>) -> Result<ImageArray> {
    let path = path.as_ref();
    let img  = image::open(path)
        .map_err(|e| SegError::data_io(path, e))?
        .to_rgb8();
    Ok(from_rgb(&img))
}

/// Preprocess an already decoded RGB image.
pub fn from_rgb(img: &RgbImage) -> ImageArray {
    let (width, height) = img.dimensions();
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);

    // RgbImage pixels iterate row-major, matching the NHWC layout
    for px in img.pixels() {
        let [r, g, b] = px.0;
        for (value, mean) in [b, g, r].into_iter().zip(MEAN_BGR) {
            data.push((value as f64 - mean) as f32);
        }
    }

    ImageArray { height: height as usize, width: width as usize, data }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn expected(r: u8, g: u8, b: u8) -> [f32; 3] {
        [
            (b as f64 - MEAN_BGR[0]) as f32,
            (g as f64 - MEAN_BGR[1]) as f32,
            (r as f64 - MEAN_BGR[2]) as f32,
        ]
    }

    #[test]
    fn test_channels_reversed_and_mean_subtracted() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([10, 20, 30]));
        img.put_pixel(1, 0, Rgb([255, 0, 128]));

        let arr = from_rgb(&img);
        assert_eq!(arr.shape(), [1, 1, 2, 3]);
        assert_eq!(arr.pixel(0, 0), expected(10, 20, 30));
        assert_eq!(arr.pixel(0, 1), expected(255, 0, 128));
    }

    #[test]
    fn test_layout_is_row_major() {
        // 1 wide, 2 tall: second row must come second in the buffer
        let mut img = RgbImage::new(1, 2);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(0, 1, Rgb([200, 100, 50]));

        let arr = from_rgb(&img);
        assert_eq!(arr.shape(), [1, 2, 1, 3]);
        assert_eq!(&arr.data[3..6], &expected(200, 100, 50));
    }

    #[test]
    fn test_build_image_reads_png() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("px.png");
        RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])).save(&path).unwrap();

        let arr = build_image(&path).unwrap();
        assert_eq!(arr.shape(), [1, 2, 3, 3]);
        assert_eq!(arr.pixel(1, 2), expected(1, 2, 3));
    }

    #[test]
    fn test_unreadable_file_is_data_io() {
        let err = build_image("/no/such/image.png").unwrap_err();
        assert!(matches!(err, SegError::DataIo { .. }));
    }
}
