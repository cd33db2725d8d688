// ============================================================
// Layer 5 — Session
// ============================================================
// One model handle plus its global step, decided once at start:
//
//   checkpoint exists? ── yes ──► RESTORE    (weights + step from disk)
//                      └─ no ───► INITIALIZE (pretrained transplant, step 0)
//
// The choice is never revisited during a run. The pretrained
// store is only opened on the INITIALIZE path.

use burn::prelude::*;
use std::path::PathBuf;

use crate::domain::error::Result;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{Fcn8s, Fcn8sConfig};
use crate::ml::transplant::initialize_from_pretrained;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartState {
    Restored,
    Initialized,
}

/// Where INITIALIZE gets its weights from.
#[derive(Debug, Clone)]
pub struct PretrainedSource {
    pub weights:   PathBuf,
    /// JSON layer map; the built-in table when None
    pub layer_map: Option<PathBuf>,
}

pub struct Session<B: Backend> {
    pub model: Fcn8s<B>,
    pub step:  u64,
    pub start: StartState,
}

impl<B: Backend> Session<B> {
    pub fn open(
        model_cfg:  &Fcn8sConfig,
        ckpt:       &CheckpointManager,
        pretrained: &PretrainedSource,
        device:     &B::Device,
    ) -> Result<Self> {
        let model = model_cfg.init::<B>(device);

        match ckpt.latest_step()? {
            Some(_) => {
                let (model, step) = ckpt.load_model(model, device)?;
                tracing::info!(
                    "Restored checkpoint at step {} from '{}'",
                    step,
                    ckpt.dir().display()
                );
                Ok(Self { model, step, start: StartState::Restored })
            }
            None => {
                tracing::info!(
                    "No checkpoint in '{}', initialising from '{}'",
                    ckpt.dir().display(),
                    pretrained.weights.display()
                );
                let model = initialize_from_pretrained(
                    model,
                    &pretrained.weights,
                    pretrained.layer_map.as_deref(),
                    device,
                )?;
                Ok(Self { model, step: 0, start: StartState::Initialized })
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::SegError;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn tiny() -> Fcn8sConfig {
        Fcn8sConfig::new(2).with_base_width(2).with_fc_width(4)
    }

    #[test]
    fn test_restores_when_checkpoint_present() {
        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();
        ckpt.save_model(&tiny().init::<TestBackend>(&device), 42).unwrap();

        // The weight file does not exist: it must not be touched
        let pretrained = PretrainedSource {
            weights:   tmp.path().join("absent.safetensors"),
            layer_map: None,
        };
        let session = Session::<TestBackend>::open(&tiny(), &ckpt, &pretrained, &device).unwrap();
        assert_eq!(session.start, StartState::Restored);
        assert_eq!(session.step, 42);
    }

    #[test]
    fn test_initialize_needs_the_store() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        let pretrained = PretrainedSource {
            weights:   tmp.path().join("absent.safetensors"),
            layer_map: None,
        };
        let err = Session::<TestBackend>::open(&tiny(), &ckpt, &pretrained, &Default::default())
            .err()
            .unwrap();
        assert!(matches!(err, SegError::DataIo { .. }));
    }
}
