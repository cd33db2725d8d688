// ============================================================
// Layer 4 — Pair Loader
// ============================================================
// Lists the image directory and pairs each image with its mask:
//
//   images_data_crop/00015.png  →  images_mask/00015_mask.mat
//
// The stem is everything before the FIRST dot of the file name,
// so "a.b.png" pairs with "a_mask.<ext>".
//
// Reference: Rust Book §9 (Error Handling)

use std::{fs, path::{Path, PathBuf}};

use crate::domain::error::{Result, SegError};
use crate::domain::sample::SegmentationPair;
use crate::domain::traits::PairSource;

/// Loads (image, mask) pairs from two parallel directories.
/// Implements the PairSource trait from Layer 3.
pub struct DirectoryPairLoader {
    images_dir: PathBuf,
    masks_dir:  PathBuf,
    /// Extension of mask files, without the dot
    mask_ext:   String,
}

impl DirectoryPairLoader {
    pub fn new(
        images_dir: impl Into<PathBuf>,
        masks_dir:  impl Into<PathBuf>,
        mask_ext:   impl Into<String>,
    ) -> Self {
        Self {
            images_dir: images_dir.into(),
            masks_dir:  masks_dir.into(),
            mask_ext:   mask_ext.into(),
        }
    }

    /// Mask path for an image file name, e.g. "00015.png" → "<masks>/00015_mask.<ext>"
    pub fn mask_path_for(&self, image_name: &str) -> PathBuf {
        let stem = image_name.split('.').next().unwrap_or(image_name);
        self.masks_dir.join(format!("{stem}_mask.{}", self.mask_ext))
    }
}

impl PairSource for DirectoryPairLoader {
    fn load_all(&self) -> Result<Vec<SegmentationPair>> {
        let dir = Path::new(&self.images_dir);

        if !dir.exists() {
            tracing::warn!(
                "Image directory '{}' does not exist, returning no pairs",
                dir.display()
            );
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| SegError::data_io(dir, e))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        // read_dir order is platform-dependent
        names.sort();

        let mut pairs = Vec::with_capacity(names.len());
        for name in names {
            let mask = self.mask_path_for(&name);
            if !mask.is_file() {
                return Err(SegError::data_io(
                    &mask,
                    format!("no mask for image '{name}'"),
                ));
            }
            pairs.push(SegmentationPair::new(dir.join(&name), mask));
        }

        tracing::info!("Discovered {} image/mask pairs", pairs.len());
        Ok(pairs)
    }
}
