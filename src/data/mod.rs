// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the flat text files on disk and the
// tensor batches the training loop consumes:
//
//   Input.txt / Output.txt
//       │
//       ▼
//   SampleIndex     → one scan, byte offset of every record
//       │
//       ▼
//   DataFile        → seek + parse the requested rows
//       │
//       ▼
//   MotionDataset   → Burn Dataset of (input, target) samples
//       │
//       ▼
//   shuffler        → per-epoch permutation, batch slices
//       │
//       ▼
//   MotionBatcher   → Burn Batcher stacking samples into tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Byte-offset table over newline-delimited records
pub mod sample_index;

/// Data-file and norm-file readers
pub mod loader;

/// Input/output file pair implementing Burn's Dataset trait
pub mod dataset;

/// Implements Burn's Batcher trait: samples → device tensors
pub mod batcher;

/// Per-epoch permutation and batch slicing
pub mod shuffler;
