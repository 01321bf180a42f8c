// ============================================================
// Layer 5 — Activations
// ============================================================
// Per-layer activation choice for the MLP, plus ELU, which the
// gating network uses on all of its hidden layers.
//
//   elu(x) = x            for x > 0
//            exp(x) - 1   otherwise
//
// Written as relu(x) + exp(min(x, 0)) - 1 so it stays a single
// differentiable expression on every backend.

use burn::{prelude::*, tensor::activation};
use serde::{Deserialize, Serialize};

/// Activation applied after an affine transition.
/// Held by layers as an `Ignored` field: no parameters, nothing recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Elu,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Elu     => elu(x),
            Activation::Relu    => activation::relu(x),
            Activation::Tanh    => activation::tanh(x),
            Activation::Sigmoid => activation::sigmoid(x),
        }
    }
}

/// Exponential linear unit with alpha = 1.
pub fn elu<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    activation::relu(x.clone()) + x.clamp_max(0.0).exp().sub_scalar(1.0)
}
