// ============================================================
// Layer 4 — Result Writer
// ============================================================
// Label map → palette colours → (H, W, 3) RGB raster on disk.
// The image format follows the output file's extension.

use image::RgbImage;
use std::path::Path;

use crate::domain::error::{Result, SegError};
use crate::domain::palette::colorize;
use crate::domain::sample::LabelMap;

pub fn save_color_mask(labels: &LabelMap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let rgb  = colorize(labels)?;
    let img  = RgbImage::from_raw(labels.width as u32, labels.height as u32, rgb)
        .ok_or_else(|| SegError::shape(
            "colour mask buffer",
            [labels.height, labels.width, 3],
            [labels.labels.len() * 3],
        ))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    img.save(path).map_err(|e| SegError::data_io(path, e))?;
    tracing::debug!("Wrote {}x{} mask to '{}'", labels.width, labels.height, path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::palette::COLOR_SET;

    #[test]
    fn test_written_png_reads_back_as_palette_colours() {
        let tmp    = tempfile::tempdir().unwrap();
        let path   = tmp.path().join("out").join("result.png");
        let labels = LabelMap::new(2, 2, vec![0, 1, 1, 0]);

        save_color_mask(&labels, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0, COLOR_SET[0]);
        assert_eq!(img.get_pixel(1, 0).0, COLOR_SET[1]);
    }

    #[test]
    fn test_out_of_range_writes_nothing() {
        let tmp    = tempfile::tempdir().unwrap();
        let path   = tmp.path().join("bad.png");
        let labels = LabelMap::new(1, 1, vec![99]);
        assert!(save_color_mask(&labels, &path).is_err());
        assert!(!path.exists());
    }
}
