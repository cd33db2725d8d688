// ============================================================
// Layer 4 — Minibatch Sampler
// ============================================================
// Each draw picks `batch_size` distinct pairs uniformly at
// random. Draws are independent, so the same pair can appear
// again in a later minibatch. There are no epochs.
//
// The RNG is a seeded StdRng so that a run is repeatable.

use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, SeedableRng};

use crate::domain::error::{Result, SegError};
use crate::domain::sample::SegmentationPair;

pub struct MinibatchSampler {
    rng:        StdRng,
    batch_size: usize,
}

impl MinibatchSampler {
    pub fn new(batch_size: usize, seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), batch_size }
    }

    /// Draw one minibatch without replacement.
    pub fn draw<D>(&mut self, dataset: &D) -> Result<Vec<SegmentationPair>>
    where
        D: Dataset<SegmentationPair>,
    {
        let len = dataset.len();
        if self.batch_size == 0 || self.batch_size > len {
            return Err(SegError::Config(format!(
                "cannot draw {} pairs from a training set of {}",
                self.batch_size, len
            )));
        }

        rand::seq::index::sample(&mut self.rng, len, self.batch_size)
            .into_iter()
            .map(|i| {
                dataset.get(i).ok_or_else(|| {
                    SegError::Config(format!("dataset has no pair at index {i}"))
                })
            })
            .collect()
    }
}
