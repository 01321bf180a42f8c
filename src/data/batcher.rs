// ============================================================
// Layer 4 — Motion Batcher
// ============================================================
// Implements Burn's Batcher trait to turn the MotionSamples of
// one mini-batch into tensors on the training device.
//
//   Input:  Vec of n MotionSamples
//   Output: MotionBatch with inputs [n, input_dim]
//                            targets [n, output_dim]
//
// Every row of a file has the same width (DataFile rejects
// ragged rows), so the rows are concatenated in order and the
// flat buffer becomes one TensorData per matrix.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*, tensor::TensorData};

use crate::data::dataset::MotionSample;

// ─── MotionBatch ──────────────────────────────────────────────────────────────
/// One mini-batch ready for the forward pass.
/// B is the Burn Backend: generic so the same batcher serves
/// the autodiff training backend and the plain inference backend.
#[derive(Debug, Clone)]
pub struct MotionBatch<B: Backend> {
    /// Raw (un-normalized) input features: shape: [batch_size, input_dim]
    pub inputs: Tensor<B, 2>,

    /// Raw target features: shape: [batch_size, output_dim]
    pub targets: Tensor<B, 2>,
}

// ─── MotionBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug, Default)]
pub struct MotionBatcher;

impl MotionBatcher {
    pub fn new() -> Self {
        Self
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<B, MotionSample, MotionBatch<B>> for MotionBatcher {
    fn batch(&self, items: Vec<MotionSample>, device: &B::Device) -> MotionBatch<B> {
        let n = items.len();
        let input_dim  = items.first().map_or(0, |s| s.inputs.len());
        let output_dim = items.first().map_or(0, |s| s.targets.len());

        let mut inputs  = Vec::with_capacity(n * input_dim);
        let mut targets = Vec::with_capacity(n * output_dim);
        for sample in items {
            inputs.extend(sample.inputs);
            targets.extend(sample.targets);
        }

        MotionBatch {
            inputs:  matrix(inputs, n, input_dim, device),
            targets: matrix(targets, n, output_dim, device),
        }
    }
}

/// Build a [rows, cols] tensor from a flat row-major buffer.
fn matrix<B: Backend>(values: Vec<f32>, rows: usize, cols: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 2>::from_data(TensorData::new(values, [rows, cols]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn sample(inputs: &[f32], targets: &[f32]) -> MotionSample {
        MotionSample { inputs: inputs.to_vec(), targets: targets.to_vec() }
    }

    #[test]
    fn test_batch_shapes_and_values() {
        let device  = <NdArray as Backend>::Device::default();
        let items   = vec![sample(&[1.0, 2.0, 3.0], &[7.0]), sample(&[4.0, 5.0, 6.0], &[8.0])];
        let batch: MotionBatch<NdArray> = MotionBatcher::new().batch(items, &device);

        assert_eq!(batch.inputs.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2, 1]);
        let values: Vec<f32> = batch.inputs.into_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let targets: Vec<f32> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![7.0, 8.0]);
    }
}
