// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses the command line
// with clap and hands each subcommand to a Layer 2 use case.
//
//   1. `run`              — train, then segment 00015.png → result.png
//   2. `train`            — fine-tune from checkpoint or pretrained store
//   3. `segment`          — colour-coded mask for one image
//   4. `export-layer-map` — dump the built-in layer map as JSON
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, ExportLayerMapArgs, RunArgs, SegmentArgs, TrainArgs};

use crate::application::{
    segment_use_case::{SegmentOutcome, SegmentUseCase},
    train_use_case::{TrainConfig, TrainUseCase},
};
use crate::domain::layer_map::LayerMap;
use crate::infra::weight_store::save_layer_map;
use crate::ml::trainer::TrainSummary;

#[derive(Parser, Debug)]
#[command(
    name = "portrait-fcn",
    version = "0.1.0",
    about = "Fine-tune an FCN8s portrait segmenter from pretrained weights, then colour its masks."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args)            => run_all(args),
            Commands::Train(args)          => run_train(args),
            Commands::Segment(args)        => run_segment(args),
            Commands::ExportLayerMap(args) => run_export(args),
        }
    }
}

fn run_all(args: RunArgs) -> Result<()> {
    let cfg: TrainConfig = args.train.into();

    let summary = TrainUseCase::new(cfg.clone()).execute()?;
    report_training(&summary);

    let outcome = SegmentUseCase::new(cfg, args.image, args.output).execute()?;
    report_segmentation(&outcome);
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    let summary = TrainUseCase::new(args.into()).execute()?;
    report_training(&summary);
    Ok(())
}

fn run_segment(args: SegmentArgs) -> Result<()> {
    let outcome = SegmentUseCase::new(args.model.into(), args.image, args.output).execute()?;
    report_segmentation(&outcome);
    Ok(())
}

fn run_export(args: ExportLayerMapArgs) -> Result<()> {
    let map = LayerMap::default();
    save_layer_map(&map, &args.out)
        .with_context(|| format!("Cannot export layer map to '{}'", args.out.display()))?;
    println!(
        "Wrote layer map '{}' (version {}, {} entries) to {}",
        map.source,
        map.version,
        map.entries.len(),
        args.out.display()
    );
    Ok(())
}

fn report_training(s: &TrainSummary) {
    match s.last_loss {
        Some(loss) => println!(
            "Training complete: {} steps, {} → {} ({:?}), last loss {:.6}",
            s.steps_run(), s.first_step, s.final_step, s.start, loss
        ),
        None => println!("Nothing to train: already at step {}", s.final_step),
    }
}

fn report_segmentation(o: &SegmentOutcome) {
    let total = o.class_counts.iter().sum::<usize>().max(1);
    let shares: Vec<String> = o
        .class_counts
        .iter()
        .enumerate()
        .map(|(c, n)| format!("class {c}: {:.1}%", *n as f64 * 100.0 / total as f64))
        .collect();
    println!(
        "Saved {} (model at step {}, {:?}) | {}",
        o.output.display(),
        o.step,
        o.start,
        shares.join(", ")
    );
}
