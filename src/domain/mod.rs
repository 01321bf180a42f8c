// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing the training problem:
// normalization statistics and feature index partitions.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs and enums
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Per-feature mean / deviation vectors
pub mod norm_stats;

// Gating / main feature index partitions
pub mod feature_indices;
