// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, seeds, trains or runs the network.
//
//   model.rs      — The FCN8s graph on top of burn::nn blocks
//                   • VGG16 backbone (13 convs, ceil-mode pooling)
//                   • fc6 / fc7 as convolutions
//                   • pool3 / pool4 skip streams, x2 x2 x8 upsampling
//                   • named access to every layer's parameters
//
//   transplant.rs — Copies pretrained blobs into named layers
//                   through a validated LayerMap
//
//   session.rs    — Restore-or-initialise, decided once per run
//
//   trainer.rs    — The SGD step loop with logging and checkpoints
//
//   inferencer.rs — Dropout-free forward pass + per-pixel argmax
//
// Backends: the `wgpu` feature (on by default) runs on the GPU;
// without it everything runs on NdArray. Training wraps either
// in Autodiff.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Long, Shelhamer & Darrell (2015) FCN

/// FCN8s network architecture
pub mod model;

/// Pretrained weight transplant
pub mod transplant;

/// Restore-or-initialise session state
pub mod session;

/// Step-driven training loop with checkpointing
pub mod trainer;

/// Inference engine — label map for one image
pub mod inferencer;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray<f32>;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
