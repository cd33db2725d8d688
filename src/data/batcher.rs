// ============================================================
// Layer 4 — Segmentation Batcher
// ============================================================
// Stacks loaded items into tensors for one training step:
//
//   images: [N, H, W, 3] float (BGR, mean-centred)
//   masks:  [N, H, W]    int   (class index per pixel)
//
// Images are not resized, so every item in a batch must share
// the same H and W. A mismatch is reported, not padded.
//
// Reference: Burn Book §4 (Batcher)

use burn::prelude::*;

use crate::domain::error::{Result, SegError};
use crate::domain::sample::{ImageArray, SegmentationItem};

// ─── SegmentationBatch ────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SegmentationBatch<B: Backend> {
    /// Shape [batch_size, height, width, 3]
    pub images: Tensor<B, 4>,

    /// Shape [batch_size, height, width]
    pub masks: Tensor<B, 3, Int>,
}

// ─── SegmentationBatcher ──────────────────────────────────────────────────────
/// Holds the target device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct SegmentationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SegmentationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// A single preprocessed image as a [1, H, W, 3] tensor.
    pub fn image_tensor(&self, image: &ImageArray) -> Tensor<B, 4> {
        Tensor::from_data(TensorData::new(image.data.clone(), image.shape()), &self.device)
    }

    pub fn batch(&self, items: &[SegmentationItem]) -> Result<SegmentationBatch<B>> {
        let first = items
            .first()
            .ok_or_else(|| SegError::Config("cannot batch zero items".to_string()))?;
        let (height, width) = (first.image.height, first.image.width);

        // ── Check every item against the first ────────────────────────────────
        for (i, item) in items.iter().enumerate() {
            if (item.image.height, item.image.width) != (height, width) {
                return Err(SegError::shape(
                    format!("image {i} of batch"),
                    [height, width],
                    [item.image.height, item.image.width],
                ));
            }
            if item.mask.shape() != [height, width] {
                return Err(SegError::shape(
                    format!("mask {i} of batch"),
                    [height, width],
                    item.mask.shape(),
                ));
            }
        }

        // ── Flatten in batch order ────────────────────────────────────────────
        let image_flat: Vec<f32> = items
            .iter()
            .flat_map(|it| it.image.data.iter().copied())
            .collect();

        let mask_flat: Vec<i64> = items
            .iter()
            .flat_map(|it| it.mask.labels.iter().map(|&l| l as i64))
            .collect();

        let batch_size = items.len();
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(image_flat, [batch_size, height, width, 3]),
            &self.device,
        );
        let masks = Tensor::<B, 3, Int>::from_data(
            TensorData::new(mask_flat, [batch_size, height, width]),
            &self.device,
        );

        tracing::debug!("Batched {} items of {}x{}", batch_size, height, width);
        Ok(SegmentationBatch { images, masks })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::LabelMap;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn item(h: usize, w: usize, fill: f32, class: usize) -> SegmentationItem {
        SegmentationItem {
            image: ImageArray { height: h, width: w, data: vec![fill; h * w * 3] },
            mask:  LabelMap::filled(h, w, class),
        }
    }

    #[test]
    fn test_batch_shapes_and_order() {
        let batcher = SegmentationBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(&[item(2, 3, 1.0, 0), item(2, 3, 2.0, 1)]).unwrap();

        assert_eq!(batch.images.dims(), [2, 2, 3, 3]);
        assert_eq!(batch.masks.dims(),  [2, 2, 3]);

        let masks = batch.masks.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(&masks[..6], &[0; 6]);
        assert_eq!(&masks[6..], &[1; 6]);

        let images = batch.images.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(images[0], 1.0);
        assert_eq!(images[images.len() - 1], 2.0);
    }

    #[test]
    fn test_mixed_sizes_rejected() {
        let batcher = SegmentationBatcher::<TestBackend>::new(Default::default());
        let err     = batcher.batch(&[item(2, 2, 0.0, 0), item(3, 2, 0.0, 0)]).unwrap_err();
        assert!(matches!(err, SegError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_batch_rejected() {
        let batcher = SegmentationBatcher::<TestBackend>::new(Default::default());
        assert!(batcher.batch(&[]).is_err());
    }
}
