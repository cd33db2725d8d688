// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven SGD fine-tuning. There are no epochs: every step
// draws a fresh random minibatch.
//
//   Session::open ─► RESTORE or INITIALIZE (once)
//        │
//        ▼
//   while step < max_steps:
//       draw pairs ─► read + preprocess ─► batch
//       forward_loss ─► backward ─► SGD update
//       step += 1
//       every log_every        → info! + metrics.csv
//       every checkpoint_every → model_step_<N>.mpk.gz
//
//   last step not checkpointed? → one final save
//
// Any unreadable pair or inconsistent batch ends the run with
// the error; nothing is skipped or retried.
//
// Reference: Burn Book §5 (Custom Training Loop)

use burn::{
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::SegmentationBatcher,
    dataset::{read_item, SegmentationDataset},
    sampler::MinibatchSampler,
};
use crate::domain::error::Result;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{MetricsLogger, StepMetrics},
};
use crate::ml::session::{Session, StartState};
use crate::ml::TrainBackend;

/// What a call to run_training did.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub start:      StartState,
    pub first_step: u64,
    pub final_step: u64,
    /// Loss of the last step run, if any step ran
    pub last_loss:  Option<f64>,
}

impl TrainSummary {
    pub fn steps_run(&self) -> u64 {
        self.final_step - self.first_step
    }
}

pub fn run_training(
    cfg:     &TrainConfig,
    dataset: SegmentationDataset,
    ckpt:    &CheckpointManager,
) -> Result<TrainSummary> {
    let device = <TrainBackend as Backend>::Device::default();
    tracing::info!("Using device: {:?}", device);
    train_loop::<TrainBackend>(cfg, dataset, ckpt, &device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    dataset: SegmentationDataset,
    ckpt:    &CheckpointManager,
    device:  &B::Device,
) -> Result<TrainSummary> {
    cfg.validate()?;

    // ── Restore or initialise ─────────────────────────────────────────────────
    let session = Session::<B>::open(&cfg.model_config(), ckpt, &cfg.pretrained(), device)?;
    let start      = session.start;
    let first_step = session.step;
    let mut model  = session.model;
    let mut step   = first_step;

    if step >= cfg.max_steps {
        tracing::info!(
            "Step {} already reaches max_steps {}, nothing to train",
            step, cfg.max_steps
        );
        return Ok(TrainSummary { start, first_step, final_step: step, last_loss: None });
    }

    // ── Plain SGD ─────────────────────────────────────────────────────────────
    // θ = θ - lr * ∇L
    let mut optim = SgdConfig::new().init();

    // Offsetting by the step keeps a resumed run from replaying
    // the minibatch sequence of the first run.
    let mut sampler = MinibatchSampler::new(cfg.batch_size, cfg.seed.wrapping_add(step));
    let batcher     = SegmentationBatcher::<B>::new(device.clone());
    let metrics     = MetricsLogger::new(ckpt.dir())?;

    tracing::info!(
        "Training from step {} to {} (batch {}, lr {}), metrics in '{}'",
        step, cfg.max_steps, cfg.batch_size, cfg.lr, metrics.csv_path().display()
    );

    // ── Step loop ─────────────────────────────────────────────────────────────
    let mut last_saved = (start == StartState::Restored).then_some(step);
    let mut last_loss  = None;

    while step < cfg.max_steps {
        let pairs = sampler.draw(&dataset)?;
        let items = pairs
            .iter()
            .map(|pair| read_item(pair, cfg.num_classes))
            .collect::<Result<Vec<_>>>()?;
        let batch = batcher.batch(&items)?;

        let (loss, _) = model.forward_loss(batch.images, batch.masks);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(cfg.lr, model, grads);

        step += 1;
        last_loss = Some(loss_val);

        if step % cfg.log_every == 0 {
            tracing::info!("step {:>7} | loss {:.6}", step, loss_val);
            metrics.log(&StepMetrics::new(step, loss_val))?;
        }

        if step % cfg.checkpoint_every == 0 {
            ckpt.save_model(&model, step)?;
            last_saved = Some(step);
        }
    }

    if last_saved != Some(step) {
        ckpt.save_model(&model, step)?;
    }

    tracing::info!("Training complete at step {}", step);
    Ok(TrainSummary { start, first_step, final_step: step, last_loss })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layer_map::LayerMap;
    use crate::domain::sample::SegmentationPair;
    use crate::ml::model::Fcn8sConfig;
    use crate::ml::transplant::matching_store;
    use burn::backend::{Autodiff, NdArray};
    use image::{GrayImage, Rgb, RgbImage};
    use std::path::Path;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn tiny_config(dir: &Path) -> TrainConfig {
        TrainConfig {
            images_dir:         dir.join("images"),
            masks_dir:          dir.join("masks"),
            checkpoint_dir:     dir.join("model"),
            pretrained_weights: dir.join("absent.safetensors"),
            batch_size:         1,
            max_steps:          1,
            log_every:          1,
            checkpoint_every:   500,
            base_width:         2,
            fc_width:           4,
            ..TrainConfig::default()
        }
    }

    fn write_pair(dir: &Path) -> SegmentationDataset {
        let image = dir.join("p.png");
        let mask  = dir.join("p_mask.png");
        RgbImage::from_pixel(2, 2, Rgb([200, 120, 40])).save(&image).unwrap();
        GrayImage::from_raw(2, 2, vec![0, 1, 1, 0]).unwrap().save(&mask).unwrap();
        SegmentationDataset::new(vec![SegmentationPair::new(image, mask)])
    }

    /// One 2x2 pair on disk plus a step-0 checkpoint so the run restores.
    fn fixture(dir: &Path, cfg: &TrainConfig) -> (SegmentationDataset, CheckpointManager) {
        let dataset = write_pair(dir);
        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir);
        let model   = cfg.model_config().init::<NdArray<f32>>(&Default::default());
        ckpt.save_model(&model, 0).unwrap();
        (dataset, ckpt)
    }

    fn saved_steps(ckpt: &CheckpointManager) -> Vec<u64> {
        let mut steps: Vec<u64> = std::fs::read_dir(ckpt.dir())
            .unwrap()
            .filter_map(|e| {
                let name = e.unwrap().file_name().into_string().unwrap();
                name.strip_prefix("model_step_")?.strip_suffix(".mpk.gz")?.parse().ok()
            })
            .collect();
        steps.sort_unstable();
        steps
    }

    #[test]
    fn test_one_step_gives_finite_loss() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_config(tmp.path());
        let (dataset, ckpt) = fixture(tmp.path(), &cfg);

        let summary = train_loop::<TestBackend>(&cfg, dataset, &ckpt, &Default::default()).unwrap();
        assert_eq!(summary.start, StartState::Restored);
        assert_eq!(summary.steps_run(), 1);

        let loss = summary.last_loss.unwrap();
        assert!(loss.is_finite());
        assert!(loss >= 0.0);

        // Final save at step 1 and a metrics row for it
        assert_eq!(ckpt.latest_step().unwrap(), Some(1));
        let csv = std::fs::read_to_string(ckpt.dir().join("metrics.csv")).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("1,"));
    }

    #[test]
    fn test_no_steps_when_budget_spent() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { max_steps: 0, ..tiny_config(tmp.path()) };
        let (dataset, ckpt) = fixture(tmp.path(), &cfg);

        let summary = train_loop::<TestBackend>(&cfg, dataset, &ckpt, &Default::default()).unwrap();
        assert_eq!(summary.steps_run(), 0);
        assert_eq!(summary.last_loss, None);
        assert_eq!(ckpt.latest_step().unwrap(), Some(0));
    }

    #[test]
    fn test_missing_image_ends_training() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_config(tmp.path());
        let (_, ckpt) = fixture(tmp.path(), &cfg);
        let dataset = SegmentationDataset::new(vec![SegmentationPair::new(
            tmp.path().join("gone.png"),
            tmp.path().join("gone_mask.png"),
        )]);

        let err = train_loop::<TestBackend>(&cfg, dataset, &ckpt, &Default::default()).unwrap_err();
        assert!(matches!(err, crate::domain::error::SegError::DataIo { .. }));
    }

    #[test]
    fn test_checkpoint_cadence_and_final_save() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { max_steps: 3, checkpoint_every: 2, ..tiny_config(tmp.path()) };
        let (dataset, ckpt) = fixture(tmp.path(), &cfg);

        let summary = train_loop::<TestBackend>(&cfg, dataset, &ckpt, &Default::default()).unwrap();
        assert_eq!(summary.final_step, 3);

        // Step 2 on cadence, step 3 as the final save, nothing at step 1
        assert_eq!(saved_steps(&ckpt), vec![0, 2, 3]);
        assert_eq!(ckpt.latest_step().unwrap(), Some(3));
    }

    #[test]
    fn test_last_step_on_cadence_is_not_saved_twice() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { max_steps: 4, checkpoint_every: 2, ..tiny_config(tmp.path()) };
        let (dataset, ckpt) = fixture(tmp.path(), &cfg);

        train_loop::<TestBackend>(&cfg, dataset, &ckpt, &Default::default()).unwrap();
        assert_eq!(saved_steps(&ckpt), vec![0, 2, 4]);

        // Resuming at the budget restores step 4 and writes nothing new
        let dataset = write_pair(tmp.path());
        let summary = train_loop::<TestBackend>(&cfg, dataset, &ckpt, &Default::default()).unwrap();
        assert_eq!(summary.start, StartState::Restored);
        assert_eq!(summary.steps_run(), 0);
        assert_eq!(saved_steps(&ckpt), vec![0, 2, 4]);
    }

    #[test]
    fn test_fresh_run_starts_from_pretrained_store() {
        let tmp     = tempfile::tempdir().unwrap();
        let cfg     = tiny_config(tmp.path());
        let dataset = write_pair(tmp.path());

        let mut shape_donor = cfg.model_config().init::<NdArray<f32>>(&Default::default());
        matching_store(&mut shape_donor, &LayerMap::fcn8s_heavy_pascal())
            .save(&cfg.pretrained_weights)
            .unwrap();

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        assert_eq!(ckpt.latest_step().unwrap(), None);

        let summary = train_loop::<TestBackend>(&cfg, dataset, &ckpt, &Default::default()).unwrap();
        assert_eq!(summary.start, StartState::Initialized);
        assert_eq!((summary.first_step, summary.final_step), (0, 1));
        assert!(summary.last_loss.unwrap().is_finite());
        assert_eq!(saved_steps(&ckpt), vec![1]);
    }

    #[test]
    fn test_model_config_matches_train_config() {
        let cfg = tiny_config(Path::new("/tmp"));
        let m: Fcn8sConfig = cfg.model_config();
        assert_eq!((m.num_classes, m.base_width, m.fc_width), (2, 2, 4));
    }
}
