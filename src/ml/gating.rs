// ============================================================
// Layer 5 — Mixture-of-Experts Gating Network
// ============================================================
// Two paths over one normalized input vector:
//
//   Gating path (expert selection)
//     x[:, gating] ᵀ → [gin, n]
//     dropout → GW₁·g + Gb₁ → ELU
//     dropout → GW₂·g + Gb₂ → ELU
//     dropout → GW₃·g + Gb₃ → softmax over experts → g [E, n]
//
//   Expert path (per-sample blended weights)
//     x[:, main] → [n, min, 1]
//     for each of 3 expert banks EWₗ [E, out, in], Ebₗ [E, out, 1]:
//       Wₗ[s] = Σₑ g[e, s] · EWₗ[e]          (blend)
//       bₗ[s] = Σₑ g[e, s] · Ebₗ[e]
//       m     = dropout(m) → Wₗ[s]·m + bₗ[s] → ELU (not on the last bank)
//
//   prediction = renormalize(m) [n, out]
//
// Each column of g is a probability simplex, so every sample runs
// through its own convex combination of the experts.
//
// Reference: Zhang et al. (2018) Mode-Adaptive Neural Networks
//            Starke et al. (2020) Local Motion Phases

use anyhow::{bail, Result};
use burn::{
    module::{Ignored, Param},
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::activation::softmax,
};
use rand::Rng;

use crate::domain::norm_stats::NormStats;
use crate::ml::{activation::elu, init, model::ForwardModel, normalizer::Normalizer};

#[derive(Config, Debug)]
pub struct GatingNetworkConfig {
    /// Input features fed to the expert-selection network.
    pub gating_indices: Vec<usize>,
    /// Input features fed to the blended expert layers.
    pub main_indices:   Vec<usize>,
    #[config(default = "128")]
    pub gating_hidden:  usize,
    #[config(default = "512")]
    pub main_hidden:    usize,
    #[config(default = "8")]
    pub experts:        usize,
    #[config(default = "0.3")]
    pub dropout:        f64,
}

impl GatingNetworkConfig {
    /// Build the network. The output width comes from `output_norm`.
    ///
    /// A partition that does not add up to the input width only logs a
    /// warning; indices past the end of the input are an error.
    pub fn init<B: Backend, R: Rng + ?Sized>(
        &self,
        input_norm:  &NormStats,
        output_norm: &NormStats,
        rng:         &mut R,
        device:      &B::Device,
    ) -> Result<GatingNetwork<B>> {
        let input_dim = input_norm.feature_count();
        let partition = self.gating_indices.len() + self.main_indices.len();
        if partition != input_dim {
            tracing::warn!(
                "Number of gating features ({}) and main features ({}) does not match input features ({})",
                self.gating_indices.len(),
                self.main_indices.len(),
                input_dim
            );
        }
        for (name, indices) in [("gating", &self.gating_indices), ("main", &self.main_indices)] {
            if indices.is_empty() {
                bail!("{name} feature set is empty");
            }
            if let Some(&bad) = indices.iter().find(|&&i| i >= input_dim) {
                bail!("{name} feature index {bad} is outside the {input_dim} input features");
            }
        }
        if self.experts == 0 {
            bail!("the gating network needs at least one expert");
        }

        let (gin, gh, e)  = (self.gating_indices.len(), self.gating_hidden, self.experts);
        let (min, mh, out) = (self.main_indices.len(), self.main_hidden, output_norm.feature_count());

        let gate = vec![
            GateLayer::new([gh, gin], rng, device),
            GateLayer::new([gh, gh], rng, device),
            GateLayer::new([e, gh], rng, device),
        ];
        let banks = vec![
            ExpertBank::new([e, mh, min], rng, device),
            ExpertBank::new([e, mh, mh], rng, device),
            ExpertBank::new([e, out, mh], rng, device),
        ];

        tracing::info!(
            "Gating network: {} gating → {} → {} → {} experts, {} main → {} → {} → {}",
            gin, gh, gh, e, min, mh, mh, out
        );

        Ok(GatingNetwork {
            gating_indices: Ignored(self.gating_indices.clone()),
            main_indices:   Ignored(self.main_indices.clone()),
            experts:        Ignored(e),
            gate,
            banks,
            dropout:        DropoutConfig::new(self.dropout).init(),
            input_norm:     Normalizer::new(input_norm, device),
            output_norm:    Normalizer::new(output_norm, device),
        })
    }
}

// ─── Gating layer ─────────────────────────────────────────────────────────────
/// Feature-major affine layer `W·g + b`, g: [in, n].
#[derive(Module, Debug)]
pub struct GateLayer<B: Backend> {
    /// [out, in]
    pub weight: Param<Tensor<B, 2>>,
    /// [out, 1]
    pub bias:   Param<Tensor<B, 2>>,
}

impl<B: Backend> GateLayer<B> {
    fn new<R: Rng + ?Sized>(shape: [usize; 2], rng: &mut R, device: &B::Device) -> Self {
        Self {
            weight: init::weights(shape, rng, device),
            bias:   init::bias([shape[0], 1], device),
        }
    }

    pub fn forward(&self, g: Tensor<B, 2>) -> Tensor<B, 2> {
        self.weight.val().matmul(g) + self.bias.val()
    }
}

// ─── Expert bank ──────────────────────────────────────────────────────────────
/// Per-expert weights of one blended layer.
#[derive(Module, Debug)]
pub struct ExpertBank<B: Backend> {
    /// [experts, out, in]
    pub weight: Param<Tensor<B, 3>>,
    /// [experts, out, 1]
    pub bias:   Param<Tensor<B, 3>>,
}

impl<B: Backend> ExpertBank<B> {
    fn new<R: Rng + ?Sized>(shape: [usize; 3], rng: &mut R, device: &B::Device) -> Self {
        Self {
            weight: init::weights(shape, rng, device),
            bias:   init::bias([shape[0], shape[1], 1], device),
        }
    }

    /// Per-sample blended (weight [n, out, in], bias [n, out, 1]).
    pub fn blend(&self, gating: Tensor<B, 2>) -> (Tensor<B, 3>, Tensor<B, 3>) {
        (
            blend(gating.clone(), self.weight.val()),
            blend(gating, self.bias.val()),
        )
    }
}

/// Weighted sum over the expert dimension, one result per sample:
///
///   out[s] = Σₑ gating[e, s] · bank[e]
///
/// gating: [E, n], bank: [E, rows, cols] → [n, rows, cols].
/// Computed as one matrix product gᵀ · bank.reshape([E, rows·cols]).
pub fn blend<B: Backend>(gating: Tensor<B, 2>, bank: Tensor<B, 3>) -> Tensor<B, 3> {
    let [experts, rows, cols] = bank.dims();
    let [_, n] = gating.dims();
    gating
        .transpose()
        .matmul(bank.reshape([experts, rows * cols]))
        .reshape([n, rows, cols])
}

// ─── GatingNetwork ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct GatingNetwork<B: Backend> {
    pub gating_indices: Ignored<Vec<usize>>,
    pub main_indices:   Ignored<Vec<usize>>,
    pub experts:        Ignored<usize>,
    /// Three feature-major layers: hidden, hidden, experts
    pub gate:           Vec<GateLayer<B>>,
    /// Three blended layers: hidden, hidden, output
    pub banks:          Vec<ExpertBank<B>>,
    pub dropout:        Dropout,
    pub input_norm:     Normalizer<B>,
    pub output_norm:    Normalizer<B>,
}

/// Everything one forward pass produces.
#[derive(Debug, Clone)]
pub struct GatingOutput<B: Backend> {
    /// Renormalized prediction: [n, out]
    pub prediction: Tensor<B, 2>,
    /// Expert weights, one simplex per column: [experts, n]
    pub gating:     Tensor<B, 2>,
    /// Blended weight of each bank: [n, out_l, in_l]
    pub blended:    Vec<Tensor<B, 3>>,
}

impl<B: Backend> GatingNetwork<B> {
    pub fn experts(&self) -> usize {
        *self.experts
    }

    pub fn forward(&self, x: Tensor<B, 2>, training: bool) -> GatingOutput<B> {
        let x      = self.input_norm.normalize(x);
        let device = x.device();
        let [n, _] = x.dims();

        let gating = self.gate(x.clone().select(1, index_tensor(&self.gating_indices, &device)), training);

        let mut m = x
            .select(1, index_tensor(&self.main_indices, &device))
            .reshape([n, self.main_indices.len(), 1]);
        let mut blended = Vec::with_capacity(self.banks.len());

        for (i, bank) in self.banks.iter().enumerate() {
            m = self.drop(m, training);
            let (w, b) = bank.blend(gating.clone());
            m = w.clone().matmul(m) + b;
            if i + 1 < self.banks.len() {
                m = elu(m);
            }
            blended.push(w);
        }

        let [_, out, _] = m.dims();
        GatingOutput {
            prediction: self.output_norm.renormalize(m.reshape([n, out])),
            gating,
            blended,
        }
    }

    /// Expert weights for normalized gating features g: [n, gin] → [experts, n].
    fn gate(&self, g: Tensor<B, 2>, training: bool) -> Tensor<B, 2> {
        let mut g = g.transpose();
        for (i, layer) in self.gate.iter().enumerate() {
            g = layer.forward(self.drop(g, training));
            g = if i + 1 < self.gate.len() { elu(g) } else { softmax(g, 0) };
        }
        g
    }

    fn drop<const D: usize>(&self, x: Tensor<B, D>, training: bool) -> Tensor<B, D> {
        if training { self.dropout.forward(x) } else { x }
    }
}

fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let ids: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
    Tensor::from_data(TensorData::new(ids, [indices.len()]), device)
}

impl<B: Backend> ForwardModel<B> for GatingNetwork<B> {
    fn kind(&self) -> &'static str {
        "gating"
    }

    fn output_names(&self) -> &'static [&'static str] {
        &["Y", "G", "W0", "W1", "W2"]
    }

    fn input_norm(&self) -> &Normalizer<B> {
        &self.input_norm
    }

    fn output_norm(&self) -> &Normalizer<B> {
        &self.output_norm
    }

    fn predict(&self, x: Tensor<B, 2>, training: bool) -> Tensor<B, 2> {
        self.forward(x, training).prediction
    }
}
