// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands and all their configurable flags:
//
//   run              — train, then segment one image
//   train            — train only
//   segment          — segment one image with the latest weights
//   export-layer-map — write the built-in layer map as JSON
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train, then segment one image with the trained weights
    Run(RunArgs),

    /// Fine-tune the network on (image, mask) pairs
    Train(TrainArgs),

    /// Segment one image into a colour-coded mask
    Segment(SegmentArgs),

    /// Write the built-in pretrained layer map as JSON
    ExportLayerMap(ExportLayerMapArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Directory of training images
    #[arg(long, default_value = "./data/images_data_crop")]
    pub images_dir: PathBuf,

    /// Directory of label masks named <stem>_mask.<ext>
    #[arg(long, default_value = "./data/images_mask")]
    pub masks_dir: PathBuf,

    /// Mask file extension: `mat` (variable `mask`) or a label-image format
    #[arg(long, default_value = "mat")]
    pub mask_ext: String,

    /// Directory for checkpoints, config and metrics
    #[arg(long, default_value = "./model")]
    pub checkpoint_dir: PathBuf,

    /// Pretrained safetensors store, read only when no checkpoint exists
    #[arg(long, default_value = "fcn8s-heavy-pascal.safetensors")]
    pub pretrained_weights: PathBuf,

    /// JSON layer map replacing the built-in table
    #[arg(long)]
    pub layer_map: Option<PathBuf>,

    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Stop once the global step counter reaches this value
    #[arg(long, default_value_t = 100_000)]
    pub max_steps: u64,

    /// Report the loss every N steps
    #[arg(long, default_value_t = 10)]
    pub log_every: u64,

    /// Save a checkpoint every N steps
    #[arg(long, default_value_t = 500)]
    pub checkpoint_every: u64,

    /// Seed for minibatch sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of pixel classes (background, foreground, ...)
    #[arg(long, default_value_t = 2)]
    pub num_classes: usize,

    /// Channels of the first VGG block
    #[arg(long, default_value_t = 64)]
    pub base_width: usize,

    /// Channels of fc6 and fc7
    #[arg(long, default_value_t = 4096)]
    pub fc_width: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            images_dir:         a.images_dir,
            masks_dir:          a.masks_dir,
            mask_ext:           a.mask_ext,
            checkpoint_dir:     a.checkpoint_dir,
            pretrained_weights: a.pretrained_weights,
            layer_map:          a.layer_map,
            batch_size:         a.batch_size,
            lr:                 a.lr,
            max_steps:          a.max_steps,
            log_every:          a.log_every,
            checkpoint_every:   a.checkpoint_every,
            seed:               a.seed,
            num_classes:        a.num_classes,
            base_width:         a.base_width,
            fc_width:           a.fc_width,
            dropout:            a.dropout,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub train: TrainArgs,

    /// Image to segment after training
    #[arg(long, default_value = "00015.png")]
    pub image: PathBuf,

    #[arg(long, default_value = "result.png")]
    pub output: PathBuf,
}

/// Segmenting shares the model flags so a fresh initialisation
/// (no checkpoint yet) builds the same network training would.
#[derive(Args, Debug)]
pub struct SegmentArgs {
    #[command(flatten)]
    pub model: TrainArgs,

    #[arg(long)]
    pub image: PathBuf,

    /// Output raster; the format follows the extension
    #[arg(long, default_value = "result.png")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExportLayerMapArgs {
    #[arg(long)]
    pub out: PathBuf,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["portrait-fcn", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let from_cli: TrainConfig = args.into();
        let default = TrainConfig::default();
        assert_eq!(
            serde_json::to_value(&from_cli).unwrap(),
            serde_json::to_value(&default).unwrap()
        );
    }

    #[test]
    fn test_segment_requires_image() {
        assert!(Cli::try_parse_from(["portrait-fcn", "segment"]).is_err());

        let cli = Cli::try_parse_from([
            "portrait-fcn", "segment", "--image", "in.jpg", "--output", "out.png", "--num-classes", "3",
        ])
        .unwrap();
        let Commands::Segment(args) = cli.command else { panic!("expected segment") };
        assert_eq!(args.image, PathBuf::from("in.jpg"));
        assert_eq!(args.model.num_classes, 3);
    }

    #[test]
    fn test_run_defaults_to_sample_image() {
        let cli = Cli::try_parse_from(["portrait-fcn", "run", "--max-steps", "20"]).unwrap();
        let Commands::Run(args) = cli.command else { panic!("expected run") };
        assert_eq!(args.image, PathBuf::from("00015.png"));
        assert_eq!(args.output, PathBuf::from("result.png"));
        assert_eq!(args.train.max_steps, 20);
    }
}
