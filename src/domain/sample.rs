// ============================================================
// Layer 3 — Sample Domain Types
// ============================================================
// The three shapes data takes before it becomes a tensor:
//
//   SegmentationPair — where an (image, mask) pair lives on disk
//   ImageArray       — a preprocessed image, layout (1, H, W, 3) BGR
//   LabelMap         — one class index per pixel, layout (H, W)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An image file and its matching ground-truth mask file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationPair {
    pub image: PathBuf,
    pub mask:  PathBuf,
}

impl SegmentationPair {
    pub fn new(image: impl Into<PathBuf>, mask: impl Into<PathBuf>) -> Self {
        Self { image: image.into(), mask: mask.into() }
    }
}

/// A single mean-centred BGR image as a flat NHWC buffer with batch size 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArray {
    pub height: usize,
    pub width:  usize,
    /// Row-major (1, height, width, 3) values
    pub data:   Vec<f32>,
}

impl ImageArray {
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height, self.width, 3]
    }

    /// The three channel values at (row, col), in BGR order
    #[cfg(test)]
    pub fn pixel(&self, row: usize, col: usize) -> [f32; 3] {
        let i = (row * self.width + col) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// Per-pixel class labels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    pub height: usize,
    pub width:  usize,
    pub labels: Vec<usize>,
}

impl LabelMap {
    pub fn new(height: usize, width: usize, labels: Vec<usize>) -> Self {
        debug_assert_eq!(labels.len(), height * width);
        Self { height, width, labels }
    }

    #[cfg(test)]
    pub fn filled(height: usize, width: usize, class: usize) -> Self {
        Self::new(height, width, vec![class; height * width])
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn max_label(&self) -> Option<usize> {
        self.labels.iter().copied().max()
    }
}

/// A fully loaded training example.
#[derive(Debug, Clone)]
pub struct SegmentationItem {
    pub image: ImageArray,
    pub mask:  LabelMap,
}
