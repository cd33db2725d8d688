// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that name the core concepts
// of the system: image/mask pairs, pretrained parameter blobs,
// the layer-mapping table, the colour palette and the error
// taxonomy shared by every lower layer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Error taxonomy returned by data, infra and ml layers
pub mod error;

// Image arrays, label maps and on-disk training pairs
pub mod sample;

// Pretrained parameter blobs addressed by index
pub mod weights;

// Versioned segmentation-layer → pretrained-blob table
pub mod layer_map;

// Class index → RGB colour lookup
pub mod palette;

// Core abstractions (traits) that other layers implement
pub mod traits;
