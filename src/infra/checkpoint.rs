// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the network's parameters together with the
// global step counter.
//
// What gets saved per checkpoint:
//   1. Model weights (.mpk.gz file) — every trainable parameter
//   2. latest_step.json             — the step of the newest save
//
// And once per training run:
//   3. train_config.json            — hyperparameters + architecture
//
// The recorder is Burn's named MessagePack recorder at full
// precision: a save followed by a load gives back bit-identical
// f32 parameters. The recorder itself accepts a record of any shape,
// so loading compares every parameter shape against the target model
// and fails with ShapeMismatch when the architecture differs.
//
// File naming convention:
//   model/
//     model_step_500.mpk.gz    ← weights after step 500
//     model_step_1000.mpk.gz   ← weights after step 1000
//     ...
//     latest_step.json         ← contains 1000
//     train_config.json
//     metrics.csv              ← written by infra::metrics
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::{Result, SegError};
use crate::ml::model::Fcn8s;

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const LATEST_FILE: &str = "latest_step.json";
const CONFIG_FILE: &str = "train_config.json";

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Nothing touches the disk until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the model record for `step`, then move the latest pointer to it.
    pub fn save_model<B: Backend>(&self, model: &Fcn8s<B>, step: u64) -> Result<()> {
        self.ensure_dir()?;

        // The recorder appends .mpk.gz itself
        let path = self.model_path(step);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| SegError::checkpoint(&path, e))?;

        let latest = self.dir.join(LATEST_FILE);
        fs::write(&latest, step.to_string()).map_err(|e| SegError::data_io(&latest, e))?;

        tracing::info!("Saved checkpoint at step {} to '{}'", step, self.dir.display());
        Ok(())
    }

    /// Step of the newest checkpoint, or None when nothing was ever saved.
    pub fn latest_step(&self) -> Result<Option<u64>> {
        let path = self.dir.join(LATEST_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let s = fs::read_to_string(&path).map_err(|e| SegError::checkpoint(&path, e))?;
        let step = serde_json::from_str::<u64>(s.trim())
            .map_err(|e| SegError::checkpoint(&path, e))?;
        Ok(Some(step))
    }

    fn load_model_at<B: Backend>(
        &self,
        model:  Fcn8s<B>,
        step:   u64,
        device: &B::Device,
    ) -> Result<Fcn8s<B>> {
        let path     = self.model_path(step);
        let expected = model.param_shapes();

        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .map_err(|e| SegError::checkpoint(&path, e))?;
        let model = model.load_record(record);

        let found = model.param_shapes();
        if found.len() != expected.len() {
            return Err(SegError::shape(
                format!("parameter count of checkpoint step {step}"),
                [expected.len()],
                [found.len()],
            ));
        }
        for ((name, want), (_, got)) in expected.into_iter().zip(found) {
            if want != got {
                return Err(SegError::shape(format!("checkpoint step {step} {name}"), want, got));
            }
        }
        Ok(model)
    }

    /// Restore the newest checkpoint into `model` and return it with its step.
    pub fn load_model<B: Backend>(
        &self,
        model:  Fcn8s<B>,
        device: &B::Device,
    ) -> Result<(Fcn8s<B>, u64)> {
        let step = self.latest_step()?.ok_or_else(|| {
            SegError::checkpoint(self.dir.join(LATEST_FILE), "no checkpoint has been saved")
        })?;

        tracing::info!("Loading checkpoint from step {}", step);
        let model = self.load_model_at(model, step, device)?;
        Ok((model, step))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.ensure_dir()?;

        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)
            .map_err(|e| SegError::Config(format!("cannot serialise training config: {e}")))?;

        fs::write(&path, json).map_err(|e| SegError::data_io(&path, e))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).map_err(|e| SegError::checkpoint(&path, e))?;
        serde_json::from_str(&json).map_err(|e| SegError::checkpoint(&path, e))
    }

    pub fn has_config(&self) -> bool {
        self.dir.join(CONFIG_FILE).exists()
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| SegError::data_io(&self.dir, e))
    }

    fn model_path(&self, step: u64) -> PathBuf {
        self.dir.join(format!("model_step_{step}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{Fcn8sConfig, LAYER_NAMES};
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn values(t: Tensor<TestBackend, 4>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_round_trip_is_bit_identical() {
        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();
        let cfg    = Fcn8sConfig::new(2).with_base_width(2).with_fc_width(4);

        let saved = cfg.init::<TestBackend>(&device);
        ckpt.save_model(&saved, 1500).unwrap();

        let fresh = cfg.init::<TestBackend>(&device);
        let (restored, step) = ckpt.load_model(fresh, &device).unwrap();
        assert_eq!(step, 1500);

        for name in LAYER_NAMES {
            let a = saved.layer_params(name).unwrap();
            let b = restored.layer_params(name).unwrap();
            assert_eq!(values(a.weight), values(b.weight), "{name}");
            assert_eq!(
                a.bias.map(|t| t.into_data().to_vec::<f32>().unwrap()),
                b.bias.map(|t| t.into_data().to_vec::<f32>().unwrap()),
                "{name}"
            );
        }
    }

    #[test]
    fn test_latest_step_follows_newest_save() {
        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();
        let model  = Fcn8sConfig::new(2)
            .with_base_width(2)
            .with_fc_width(4)
            .init::<TestBackend>(&device);

        assert_eq!(ckpt.latest_step().unwrap(), None);
        ckpt.save_model(&model, 500).unwrap();
        ckpt.save_model(&model, 1000).unwrap();
        assert_eq!(ckpt.latest_step().unwrap(), Some(1000));
        assert!(tmp.path().join("model_step_500.mpk.gz").exists());
    }

    #[test]
    fn test_garbled_pointer_is_corrupt() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        fs::write(tmp.path().join(LATEST_FILE), "not a number").unwrap();
        assert!(matches!(
            ckpt.latest_step().unwrap_err(),
            SegError::CheckpointCorrupt { .. }
        ));
    }

    #[test]
    fn test_wider_model_rejects_narrow_checkpoint() {
        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();

        let narrow = Fcn8sConfig::new(2).with_base_width(2).with_fc_width(4);
        ckpt.save_model(&narrow.init::<TestBackend>(&device), 7).unwrap();

        let wide = Fcn8sConfig::new(2).with_base_width(3).with_fc_width(4);
        let err  = ckpt
            .load_model(wide.init::<TestBackend>(&device), &device)
            .err()
            .unwrap();
        assert!(matches!(err, SegError::ShapeMismatch { .. }), "{err}");
    }

    #[test]
    fn test_directory_created_on_first_save_only() {
        let tmp  = tempfile::tempdir().unwrap();
        let dir  = tmp.path().join("nested").join("model");
        let ckpt = CheckpointManager::new(&dir);

        assert_eq!(ckpt.latest_step().unwrap(), None);
        assert!(!ckpt.has_config());
        assert!(!dir.exists());

        ckpt.save_config(&TrainConfig::default()).unwrap();
        assert!(dir.join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_unwritable_directory_is_reported() {
        let tmp     = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let ckpt = CheckpointManager::new(blocker.join("model"));
        let err  = ckpt.save_config(&TrainConfig::default()).unwrap_err();
        assert!(matches!(err, SegError::DataIo { .. }));
    }

    #[test]
    fn test_config_round_trip() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        assert!(!ckpt.has_config());

        let cfg = TrainConfig { batch_size: 3, seed: 7, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();

        let back = ckpt.load_config().unwrap();
        assert_eq!(back.batch_size, 3);
        assert_eq!(back.seed, 7);
        assert_eq!(back.max_steps, cfg.max_steps);
    }
}
