// ============================================================
// Layer 5 — Normalizer Module
// ============================================================
// Device-side copy of NormStats owned by every model.
//
//   normalize(x)   = (x - mean) / std
//   renormalize(y) =  y * std + mean
//
// mean and std are stored as [1, features] so they broadcast
// across the batch dimension. They are frozen parameters: saved
// in every checkpoint, never updated by the optimizer.

use burn::{module::Param, prelude::*, tensor::TensorData};

use crate::domain::norm_stats::NormStats;
use crate::ml::init::frozen;

#[derive(Module, Debug)]
pub struct Normalizer<B: Backend> {
    mean: Param<Tensor<B, 2>>,
    std:  Param<Tensor<B, 2>>,
}

impl<B: Backend> Normalizer<B> {
    pub fn new(stats: &NormStats, device: &B::Device) -> Self {
        let n = stats.feature_count();
        let row = |values: &[f32]| {
            Tensor::<B, 2>::from_data(TensorData::new(values.to_vec(), [1, n]), device)
        };
        Self {
            mean: frozen(row(stats.mean())),
            std:  frozen(row(stats.std())),
        }
    }

    pub fn feature_count(&self) -> usize {
        self.mean.val().dims()[1]
    }

    pub fn normalize(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        (x - self.mean.val()) / self.std.val()
    }

    pub fn renormalize(&self, y: Tensor<B, 2>) -> Tensor<B, 2> {
        y * self.std.val() + self.mean.val()
    }
}
