// ============================================================
// Layer 5 — Parameter Initializer
// ============================================================
// Weights: every element drawn independently from
//
//     U[-bound, bound],   bound = sqrt(6 / (fan_a * fan_b))
//
// where fan_a, fan_b are the last two dimensions of the shape.
// For an expert bank [E, out, in] the bound therefore ignores the
// expert count, so each expert starts on the same scale as a
// plain [out, in] layer.
//
// Biases: zeros of the requested shape.
//
// The generator is passed in by the caller. One StdRng, seeded
// once per run, is threaded through every construction call so
// the same seed always reproduces the same initial network.
//
// Reference: Glorot & Bengio (2010)

use burn::{
    module::{Param, ParamId},
    prelude::*,
    tensor::TensorData,
};
use rand::{
    distributions::{Distribution, Uniform},
    Rng,
};

/// Uniform bound for a weight tensor of `shape`.
pub fn uniform_bound(shape: &[usize]) -> f64 {
    let fans: usize = shape.iter().rev().take(2).product();
    (6.0 / fans as f64).sqrt()
}

/// Draw the raw values of a weight tensor, row-major.
pub fn uniform_values<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Vec<f32> {
    let bound = uniform_bound(shape) as f32;
    let dist  = Uniform::new_inclusive(-bound, bound);
    let count: usize = shape.iter().product();
    (0..count).map(|_| dist.sample(rng)).collect()
}

/// A trainable weight tensor with bounded-uniform values.
pub fn weights<B: Backend, const D: usize, R: Rng + ?Sized>(
    shape:  [usize; D],
    rng:    &mut R,
    device: &B::Device,
) -> Param<Tensor<B, D>> {
    let values = uniform_values(&shape, rng);
    Param::from_tensor(Tensor::from_data(TensorData::new(values, shape), device))
}

/// A trainable zero bias tensor.
pub fn bias<B: Backend, const D: usize>(shape: [usize; D], device: &B::Device) -> Param<Tensor<B, D>> {
    Param::from_tensor(Tensor::zeros(shape, device))
}

/// A parameter that is saved with the model but never receives gradients.
pub fn frozen<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Param<Tensor<B, D>> {
    Param::initialized(ParamId::new(), tensor)
}
