// ============================================================
// Layer 5 — Model Interface
// ============================================================
// The one seam between the training loop and the networks.
// Both the MLP and the gating network implement ForwardModel,
// so a single generic loop trains either of them.
//
// The module itself is the parameter collection: the optimizer
// walks it through burn's Module visitor, and the checkpoint
// exporter records it whole.

use burn::prelude::*;

use crate::ml::normalizer::Normalizer;

/// Backend used for inference and as the inner backend of training.
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

/// Backend used for training (gradient tracking on top of InferBackend).
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

/// The single device every parameter and batch lives on for a run.
pub fn default_device() -> <InferBackend as Backend>::Device {
    Default::default()
}

pub trait ForwardModel<B: Backend>: Module<B> {
    /// Short architecture tag written into checkpoint manifests.
    fn kind(&self) -> &'static str;

    /// Names of the tensors the exported graph produces, prediction first.
    fn output_names(&self) -> &'static [&'static str];

    /// Names of the tensors the exported graph consumes.
    fn input_names(&self) -> &'static [&'static str] {
        &["X"]
    }

    fn input_norm(&self) -> &Normalizer<B>;

    fn output_norm(&self) -> &Normalizer<B>;

    /// Raw features [batch, input_dim] → renormalized prediction [batch, output_dim].
    /// `training` enables dropout.
    fn predict(&self, x: Tensor<B, 2>, training: bool) -> Tensor<B, 2>;
}
