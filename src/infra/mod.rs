// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything a training run leaves on disk:
//
//   checkpoint.rs : per-epoch parameter records and manifests,
//                   the latest-epoch pointer, and the run's
//                   TrainConfig as JSON so inference can
//                   rebuild the same architecture.
//
//   metrics.rs    : the binary per-epoch loss log and the
//                   metrics CSV.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Loss log and metrics CSV
pub mod metrics;
