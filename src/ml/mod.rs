// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn framework specific code:
// tensors, modules, autodiff, the optimizer and records.
//
// What's in this layer:
//
//   model.rs      : backend aliases and the ForwardModel trait
//                   the training loop is generic over
//
//   init.rs       : seeded uniform initializer
//                   bound = √(6 / (rows · cols)), zero biases
//
//   activation.rs : ELU and the per-layer activation choice
//
//   normalizer.rs : frozen mean/std parameters inside every model
//
//   mlp.rs        : plain multilayer perceptron
//
//   gating.rs     : mixture-of-experts gating network:
//                   • gating MLP with softmax over experts
//                   • three expert banks blended per sample
//
//   scheduler.rs  : cosine learning rate with warm restarts
//
//   trainer.rs    : the epoch / batch loop with checkpointing
//
//   inferencer.rs : rebuilds a checkpoint for prediction
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Backends and the model interface
pub mod model;

/// Parameter initialization
pub mod init;

/// Activation functions
pub mod activation;

/// Input/output normalization module
pub mod normalizer;

/// Multilayer perceptron
pub mod mlp;

/// Mixture-of-experts gating network
pub mod gating;

/// Learning-rate schedule with warm restarts
pub mod scheduler;

/// Full training loop with per-epoch checkpointing
pub mod trainer;

/// Inference engine: loads checkpoint and predicts rows
pub mod inferencer;
