// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal
// (training, or segmenting an image).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file access (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Errors from the lower layers (SegError) are wrapped in anyhow
// with context describing what the workflow was doing.

// The training workflow
pub mod train_use_case;

// The inference workflow
pub mod segment_use_case;
