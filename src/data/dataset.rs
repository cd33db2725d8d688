use burn::data::dataset::Dataset;

use crate::data::{mask, preprocessor};
use crate::domain::error::{Result, SegError};
use crate::domain::sample::{SegmentationItem, SegmentationPair};

/// The training set as a list of on-disk pairs. Files are only
/// read when a pair is drawn into a minibatch.
pub struct SegmentationDataset {
    pairs: Vec<SegmentationPair>,
}

impl SegmentationDataset {
    pub fn new(pairs: Vec<SegmentationPair>) -> Self { Self { pairs } }
}

impl Dataset<SegmentationPair> for SegmentationDataset {
    fn get(&self, index: usize) -> Option<SegmentationPair> {
        self.pairs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Read and preprocess one pair. The mask must cover the image
/// exactly and only use labels below `num_classes`.
pub fn read_item(pair: &SegmentationPair, num_classes: usize) -> Result<SegmentationItem> {
    let image = preprocessor::build_image(&pair.image)?;
    let mask  = mask::load_mask(&pair.mask)?;

    if mask.shape() != [image.height, image.width] {
        return Err(SegError::shape(
            format!("mask '{}'", pair.mask.display()),
            [image.height, image.width],
            mask.shape(),
        ));
    }
    mask::check_labels(&mask, num_classes, &pair.mask)?;

    Ok(SegmentationItem { image, mask })
}
