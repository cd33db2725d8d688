// ============================================================
// Layer 5 — Inferencer
// ============================================================
// One forward pass per image, dropout off, then per-pixel argmax:
//
//   ImageArray [1,H,W,3] ─► Fcn8s ─► scores [1,C,H,W]
//                                     └─ argmax over C ─► LabelMap (H,W)
//
// Colouring and writing the result lives in data::writer.

use burn::prelude::*;

use crate::data::batcher::SegmentationBatcher;
use crate::domain::error::{Result, SegError};
use crate::domain::sample::{ImageArray, LabelMap};
use crate::ml::model::Fcn8s;

pub struct Inferencer<B: Backend> {
    model:   Fcn8s<B>,
    batcher: SegmentationBatcher<B>,
}

impl<B: Backend> Inferencer<B> {
    /// `model` should live on a non-autodiff backend, where Dropout
    /// is already a pass-through.
    pub fn new(model: Fcn8s<B>, device: B::Device) -> Self {
        Self { model, batcher: SegmentationBatcher::new(device) }
    }

    pub fn segment(&self, image: &ImageArray) -> Result<LabelMap> {
        let input  = self.batcher.image_tensor(image);
        let labels = self.model.predict(input);

        let dims = labels.dims();
        if dims != [1, image.height, image.width] {
            return Err(SegError::shape(
                "prediction",
                [1, image.height, image.width],
                dims,
            ));
        }

        let values = labels
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| SegError::Config(format!("cannot read prediction: {e:?}")))?;

        // argmax never yields a negative index
        let labels = values.into_iter().map(|v| v.max(0) as usize).collect();
        Ok(LabelMap::new(image.height, image.width, labels))
    }
}
