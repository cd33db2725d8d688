// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application and ml layers program against these traits,
// not the concrete directory loader or safetensors store:
//
//   PairSource   — DirectoryPairLoader (images dir + masks dir)
//   WeightSource — SafetensorsStore    (pretrained blobs by index)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::error::Result;
use crate::domain::sample::SegmentationPair;
use crate::domain::weights::ParamBlob;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can enumerate (image, mask) training pairs.
pub trait PairSource {
    /// Discover every available pair, in a stable order.
    fn load_all(&self) -> Result<Vec<SegmentationPair>>;
}

// ─── WeightSource ─────────────────────────────────────────────────────────────
/// Pretrained parameters addressed by positional blob index.
pub trait WeightSource {
    fn blob(&self, index: usize) -> Option<&ParamBlob>;

    /// Every index present in the store, ascending
    fn indices(&self) -> Vec<usize>;
}
