// ============================================================
// Layer 5 — Multilayer Perceptron
// ============================================================
// A plain stack of affine layers:
//
//   x ─ normalize ─┬─ dropout ─ x·W₀ + b₀ ─ act₀ ─┐
//                  │            ...               │
//                  └─ dropout ─ x·Wₙ + bₙ ─ actₙ ─┴─ renormalize ─ y
//
// `layers` lists every width, input first, output last. Each of
// the layers.len() - 1 transitions may declare an activation;
// `None` leaves that transition linear (typical for the last one).

use anyhow::{bail, Result};
use burn::{
    module::{Ignored, Param},
    nn::{Dropout, DropoutConfig},
    prelude::*,
};
use rand::Rng;

use crate::domain::norm_stats::NormStats;
use crate::ml::{
    activation::Activation,
    init,
    model::ForwardModel,
    normalizer::Normalizer,
};

#[derive(Config, Debug)]
pub struct MlpConfig {
    /// Widths of every layer, input first.
    pub layers: Vec<usize>,
    /// One entry per transition.
    pub activations: Vec<Option<Activation>>,
    #[config(default = "0.3")]
    pub dropout: f64,
}

impl MlpConfig {
    /// ELU on every hidden transition, identity on the last.
    pub fn elu_hidden(layers: Vec<usize>) -> Self {
        let transitions = layers.len().saturating_sub(1);
        let activations = (0..transitions)
            .map(|i| (i + 1 < transitions).then_some(Activation::Elu))
            .collect();
        Self::new(layers, activations)
    }

    pub fn init<B: Backend, R: Rng + ?Sized>(
        &self,
        input_norm:  &NormStats,
        output_norm: &NormStats,
        rng:         &mut R,
        device:      &B::Device,
    ) -> Result<MlpModel<B>> {
        if self.layers.len() < 2 {
            bail!("an MLP needs at least an input and an output width, got {:?}", self.layers);
        }
        if self.activations.len() != self.layers.len() - 1 {
            bail!(
                "{} activations declared for {} layer transitions",
                self.activations.len(),
                self.layers.len() - 1
            );
        }
        let (input_dim, output_dim) = (self.layers[0], self.layers[self.layers.len() - 1]);
        if input_norm.feature_count() != input_dim {
            bail!("input norm has {} features, first layer expects {}", input_norm.feature_count(), input_dim);
        }
        if output_norm.feature_count() != output_dim {
            bail!("output norm has {} features, last layer produces {}", output_norm.feature_count(), output_dim);
        }

        let layers = self
            .layers
            .windows(2)
            .zip(&self.activations)
            .map(|(w, &activation)| DenseLayer {
                weight: init::weights([w[0], w[1]], &mut *rng, device),
                bias:   init::bias([1, w[1]], device),
                activation: Ignored(activation),
            })
            .collect();

        Ok(MlpModel {
            layers,
            dropout:     DropoutConfig::new(self.dropout).init(),
            input_norm:  Normalizer::new(input_norm, device),
            output_norm: Normalizer::new(output_norm, device),
        })
    }
}

/// One affine transition `y = act(x·W + b)`.
#[derive(Module, Debug)]
pub struct DenseLayer<B: Backend> {
    /// [in, out]
    pub weight:     Param<Tensor<B, 2>>,
    /// [1, out]
    pub bias:       Param<Tensor<B, 2>>,
    pub activation: Ignored<Option<Activation>>,
}

impl<B: Backend> DenseLayer<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let y = x.matmul(self.weight.val()) + self.bias.val();
        match &*self.activation {
            Some(act) => act.forward(y),
            None => y,
        }
    }
}

#[derive(Module, Debug)]
pub struct MlpModel<B: Backend> {
    pub layers:      Vec<DenseLayer<B>>,
    pub dropout:     Dropout,
    pub input_norm:  Normalizer<B>,
    pub output_norm: Normalizer<B>,
}

impl<B: Backend> MlpModel<B> {
    /// x: [batch, input_dim] raw → [batch, output_dim] raw
    pub fn forward(&self, x: Tensor<B, 2>, training: bool) -> Tensor<B, 2> {
        let mut y = self.input_norm.normalize(x);
        for layer in &self.layers {
            if training {
                y = self.dropout.forward(y);
            }
            y = layer.forward(y);
        }
        self.output_norm.renormalize(y)
    }
}

impl<B: Backend> ForwardModel<B> for MlpModel<B> {
    fn kind(&self) -> &'static str {
        "mlp"
    }

    fn output_names(&self) -> &'static [&'static str] {
        &["Y"]
    }

    fn input_norm(&self) -> &Normalizer<B> {
        &self.input_norm
    }

    fn output_norm(&self) -> &Normalizer<B> {
        &self.output_norm
    }

    fn predict(&self, x: Tensor<B, 2>, training: bool) -> Tensor<B, 2> {
        self.forward(x, training)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    type B = NdArray;

    fn build(seed: u64, dropout: f64) -> MlpModel<B> {
        let device = Default::default();
        MlpConfig::elu_hidden(vec![4, 8, 2])
            .with_dropout(dropout)
            .init::<B, _>(
                &NormStats::new(vec![0.1, 0.2, 0.3, 0.4], vec![1.0, 2.0, 0.5, 1.5]).unwrap(),
                &NormStats::new(vec![1.0, -1.0], vec![3.0, 0.5]).unwrap(),
                &mut StdRng::seed_from_u64(seed),
                &device,
            )
            .unwrap()
    }

    fn batch() -> Tensor<B, 2> {
        Tensor::from_floats(
            [[0.5, -1.0, 2.0, 0.0], [1.5, 0.25, -0.75, 3.0], [0.0, 0.0, 0.0, 0.0]],
            &Default::default(),
        )
    }

    #[test]
    fn test_default_activations() {
        let cfg = MlpConfig::elu_hidden(vec![10, 512, 512, 3]);
        assert_eq!(cfg.activations, vec![Some(Activation::Elu), Some(Activation::Elu), None]);
    }

    #[test]
    fn test_output_shape() {
        let model = build(1, 0.0);
        assert_eq!(model.layers.len(), 2);
        assert_eq!(model.forward(batch(), false).dims(), [3, 2]);
    }

    #[test]
    fn test_same_seed_bit_identical_predictions() {
        let a: Vec<f32> = build(23456, 0.0).forward(batch(), true).into_data().to_vec().unwrap();
        let b: Vec<f32> = build(23456, 0.0).forward(batch(), true).into_data().to_vec().unwrap();
        let c: Vec<f32> = build(99, 0.0).forward(batch(), true).into_data().to_vec().unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_inference_ignores_dropout_rate() {
        // Same seed → same weights; dropout must not act outside training.
        let a: Vec<f32> = build(3, 0.0).forward(batch(), false).into_data().to_vec().unwrap();
        let b: Vec<f32> = build(3, 0.9).forward(batch(), false).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_inconsistent_config() {
        let device = Default::default();
        let norm4 = NormStats::identity(4);
        let norm2 = NormStats::identity(2);
        let mut rng = StdRng::seed_from_u64(0);

        let bad_acts = MlpConfig::new(vec![4, 8, 2], vec![None]);
        assert!(bad_acts.init::<B, _>(&norm4, &norm2, &mut rng, &device).is_err());

        let bad_norm = MlpConfig::elu_hidden(vec![4, 8, 2]);
        assert!(bad_norm.init::<B, _>(&norm2, &norm2, &mut rng, &device).is_err());

        let too_short = MlpConfig::elu_hidden(vec![4]);
        assert!(too_short.init::<B, _>(&norm4, &norm4, &mut rng, &device).is_err());
    }
}
