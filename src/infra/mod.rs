// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of the model:
//
//   checkpoint.rs   — Saving and loading model weights plus the
//                     global step counter. Uses Burn's named
//                     MessagePack recorder at full precision.
//                     Also saves/loads TrainConfig as JSON so
//                     inference can rebuild the same network.
//
//   weight_store.rs — The pretrained parameter store (safetensors)
//                     and layer-map JSON files.
//
//   metrics.rs      — Step/loss rows appended to a CSV file.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Pretrained weight store and layer-map persistence
pub mod weight_store;

/// Training metrics CSV logger
pub mod metrics;
