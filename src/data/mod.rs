// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between files on disk and tensor batches:
//
//   images dir + masks dir
//       │
//       ▼
//   DirectoryPairLoader  → discovers (image, mask) path pairs
//       │
//       ▼
//   SegmentationDataset  → implements Burn's Dataset trait
//       │
//       ▼
//   MinibatchSampler     → draws a random minibatch of pairs
//       │
//       ▼
//   preprocessor / mask  → BGR mean-centred image, label map
//       │
//       ▼
//   SegmentationBatcher  → stacks items into tensors
//
// writer.rs goes the other way: label map → colour PNG.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Discovers image/mask pairs from two parallel directories
pub mod loader;

/// Image decoding, RGB→BGR and mean subtraction
pub mod preprocessor;

/// Ground-truth label images
pub mod mask;

/// Implements Burn's Dataset trait for segmentation pairs
pub mod dataset;

/// Uniform minibatch sampling with a seeded RNG
pub mod sampler;

/// Stacks loaded items into Burn tensors
pub mod batcher;

/// Writes colourised label maps as raster images
pub mod writer;
