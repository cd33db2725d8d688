// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Validate the configuration
//   Step 2: Discover (image, mask) pairs   (Layer 4 - data)
//   Step 3: Build the dataset              (Layer 4 - data)
//   Step 4: Save config next to weights    (Layer 6 - infra)
//   Step 5: Run the training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{dataset::SegmentationDataset, loader::DirectoryPairLoader};
use crate::domain::error::SegError;
use crate::domain::palette::COLOR_SET;
use crate::domain::traits::PairSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::Fcn8sConfig;
use crate::ml::session::PretrainedSource;
use crate::ml::trainer::{run_training, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a run. Saved as train_config.json so inference
// rebuilds exactly the network whose weights are on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub images_dir:         PathBuf,
    pub masks_dir:          PathBuf,
    pub mask_ext:           String,
    pub checkpoint_dir:     PathBuf,
    pub pretrained_weights: PathBuf,
    pub layer_map:          Option<PathBuf>,
    pub batch_size:         usize,
    pub lr:                 f64,
    pub max_steps:          u64,
    pub log_every:          u64,
    pub checkpoint_every:   u64,
    pub seed:               u64,
    pub num_classes:        usize,
    pub base_width:         usize,
    pub fc_width:           usize,
    pub dropout:            f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            images_dir:         PathBuf::from("./data/images_data_crop"),
            masks_dir:          PathBuf::from("./data/images_mask"),
            mask_ext:           "mat".to_string(),
            checkpoint_dir:     PathBuf::from("./model"),
            pretrained_weights: PathBuf::from("fcn8s-heavy-pascal.safetensors"),
            layer_map:          None,
            batch_size:         5,
            lr:                 1e-4,
            max_steps:          100_000,
            log_every:          10,
            checkpoint_every:   500,
            seed:               42,
            num_classes:        2,
            base_width:         64,
            fc_width:           4096,
            dropout:            0.5,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> Fcn8sConfig {
        Fcn8sConfig::new(self.num_classes)
            .with_base_width(self.base_width)
            .with_fc_width(self.fc_width)
            .with_dropout(self.dropout)
    }

    pub fn pretrained(&self) -> PretrainedSource {
        PretrainedSource {
            weights:   self.pretrained_weights.clone(),
            layer_map: self.layer_map.clone(),
        }
    }

    /// Errors unless `other` describes the same network shape.
    pub fn check_same_architecture(&self, other: &TrainConfig) -> crate::domain::error::Result<()> {
        let ours   = (self.num_classes, self.base_width, self.fc_width);
        let theirs = (other.num_classes, other.base_width, other.fc_width);
        if ours != theirs {
            return Err(SegError::Config(format!(
                "checkpoint in '{}' was trained with (num_classes, base_width, fc_width) = {:?}, \
                 but this run asks for {:?}",
                self.checkpoint_dir.display(), theirs, ours
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> crate::domain::error::Result<()> {
        let fail = |msg: String| Err(SegError::Config(msg));

        if self.batch_size == 0 {
            return fail("batch_size must be at least 1".to_string());
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return fail(format!("learning rate must be positive, got {}", self.lr));
        }
        if self.log_every == 0 || self.checkpoint_every == 0 {
            return fail("log_every and checkpoint_every must be at least 1".to_string());
        }
        if self.num_classes == 0 || self.num_classes > COLOR_SET.len() {
            return fail(format!(
                "num_classes must be between 1 and {}, got {}",
                COLOR_SET.len(), self.num_classes
            ));
        }
        if self.base_width == 0 || self.fc_width == 0 {
            return fail("base_width and fc_width must be at least 1".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return fail(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Reject bad settings before touching the disk ──────────────
        cfg.validate().context("Invalid training configuration")?;

        // ── Step 2: Discover training pairs ───────────────────────────────────
        tracing::info!(
            "Discovering pairs in '{}' and '{}'",
            cfg.images_dir.display(),
            cfg.masks_dir.display()
        );
        let loader = DirectoryPairLoader::new(&cfg.images_dir, &cfg.masks_dir, &cfg.mask_ext);
        let pairs  = loader.load_all().context("Failed to discover training pairs")?;
        tracing::info!("Found {} training pairs", pairs.len());

        if pairs.len() < cfg.batch_size {
            anyhow::bail!(
                "Need at least {} training pairs for a minibatch, found {} in '{}'",
                cfg.batch_size,
                pairs.len(),
                cfg.images_dir.display()
            );
        }

        // ── Step 3: Build the dataset ─────────────────────────────────────────
        let dataset = SegmentationDataset::new(pairs);

        // ── Step 4: Save config for inference ─────────────────────────────────
        // A resumed run must build the network its checkpoint was saved from
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        if ckpt.latest_step()?.is_some() && ckpt.has_config() {
            let saved = ckpt.load_config()?;
            cfg.check_same_architecture(&saved)?;
        }
        ckpt.save_config(cfg)?;

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        let summary = run_training(cfg, dataset, &ckpt).context("Training failed")?;
        Ok(summary)
    }
}
