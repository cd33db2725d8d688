// ============================================================
// Layer 2 — SegmentUseCase
// ============================================================
// Orchestrates inference for one image:
//
//   Step 1: Pick the architecture      (saved train_config.json, else CLI config)
//   Step 2: Restore or initialise      (Layer 5 - ml::session)
//   Step 3: Preprocess the image       (Layer 4 - data)
//   Step 4: Predict a label map        (Layer 5 - ml)
//   Step 5: Colour and write it        (Layer 4 - data)

use anyhow::{Context, Result};
use burn::prelude::Backend;
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::{preprocessor::build_image, writer::save_color_mask};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    inferencer::Inferencer,
    session::{Session, StartState},
    InferBackend,
};

#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub output: PathBuf,
    pub start:  StartState,
    pub step:   u64,
    /// Pixels per class, indexed by class
    pub class_counts: Vec<usize>,
}

pub struct SegmentUseCase {
    config: TrainConfig,
    image:  PathBuf,
    output: PathBuf,
}

impl SegmentUseCase {
    pub fn new(config: TrainConfig, image: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self { config, image: image.into(), output: output.into() }
    }

    pub fn execute(&self) -> Result<SegmentOutcome> {
        let device = <InferBackend as Backend>::Device::default();
        self.execute_on::<InferBackend>(&device)
    }

    pub fn execute_on<B: Backend>(&self, device: &B::Device) -> Result<SegmentOutcome> {
        let ckpt = CheckpointManager::new(&self.config.checkpoint_dir);

        // ── Step 1: The saved architecture wins over the command line ─────────
        let model_cfg = if ckpt.has_config() {
            ckpt.load_config()
                .context("Cannot read the saved training config")?
                .model_config()
        } else {
            self.config.model_config()
        };

        // ── Step 2: Restore or initialise ─────────────────────────────────────
        let session = Session::<B>::open(
            &model_cfg,
            &ckpt,
            &self.config.pretrained(),
            device,
        )
        .context("Cannot prepare the model for inference")?;

        // ── Steps 3-4: Preprocess and predict ─────────────────────────────────
        let image = build_image(&self.image)
            .with_context(|| format!("Cannot read input image '{}'", self.image.display()))?;
        let inferencer = Inferencer::new(session.model, device.clone());
        let labels     = inferencer.segment(&image)?;

        let mut class_counts = vec![0usize; model_cfg.num_classes];
        for &l in &labels.labels {
            if let Some(count) = class_counts.get_mut(l) {
                *count += 1;
            }
        }

        // ── Step 5: Colour and write ──────────────────────────────────────────
        save_color_mask(&labels, &self.output)
            .with_context(|| format!("Cannot write result to '{}'", self.output.display()))?;
        tracing::info!("Segmentation written to '{}'", self.output.display());

        Ok(SegmentOutcome {
            output: self.output.clone(),
            start:  session.start,
            step:   session.step,
            class_counts,
        })
    }
}
