// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One generic loop for every ForwardModel:
//
//   for epoch in 0..epochs
//     scheduler.step()                     ← epoch tick
//     order = fresh permutation (seeded rng)
//     for slice in order.chunks(batch_size)
//       samples = dataset.get(i) for i in slice
//       batch   = batcher.batch(samples)
//       pred  = model.predict(x, training = true)
//       loss  = MSE(norm_out(pred), norm_out(target))
//       backward
//       θ ← θ − wd·θ                       ← scheduled decay
//       AdamW step at scheduled lr
//       scheduler.batch_step()             ← intra-epoch tick
//     export checkpoint, loss log, metrics row
//
// Key Burn 0.20 insight:
//   - Training runs on Autodiff<InferBackend> for gradients
//   - model.valid() strips autodiff for inference after training
//   - The normalizers are frozen params, so the optimizer skips them
//   - AdamW itself carries no weight decay; the scheduled decay is
//     applied by a ModuleMapper walking the trainable params
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{Context, Result};
use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::{AutodiffModule, ModuleMapper, Param},
    nn::loss::{MseLoss, Reduction},
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::Rng;
use std::time::Instant;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{MotionBatch, MotionBatcher},
    dataset::MotionSample,
    shuffler,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, LossLog, MetricsLogger},
};
use crate::ml::{model::ForwardModel, scheduler::CyclicLrWithRestarts};

/// Trained model plus the per-epoch mean losses.
pub struct TrainOutcome<M> {
    pub model:  M,
    pub losses: Vec<f64>,
}

pub fn run_training<B, M, D, R>(
    cfg:     &TrainConfig,
    model:   M,
    dataset: &D,
    rng:     &mut R,
    ckpt:    &CheckpointManager,
    device:  &B::Device,
) -> Result<TrainOutcome<M>>
where
    B: AutodiffBackend,
    M: ForwardModel<B> + AutodiffModule<B>,
    D: Dataset<MotionSample>,
    R: Rng + ?Sized,
{
    let samples = dataset.len();
    let mut model = model;

    // ── AdamW optimiser ──────────────────────────────────────────────────────
    // θ = (1 - wd_t) * θ                 (decay_weights)
    // m = β1*m + (1-β1)*g
    // v = β2*v + (1-β2)*g²
    // θ = θ - lr_t * m / (√v + ε)
    let mut optim = AdamWConfig::new()
        .with_weight_decay(0.0)
        .init::<B, M>();

    let mut scheduler = CyclicLrWithRestarts::new(
        cfg.learning_rate,
        cfg.weight_decay,
        cfg.batch_size,
        samples,
        cfg.restart_period,
        cfg.restart_mult,
    )?;

    let batcher    = MotionBatcher::new();
    let mse        = MseLoss::new();
    let mut losses = LossLog::new(ckpt.dir(), cfg.epochs);
    let metrics    = MetricsLogger::new(ckpt.dir())?;
    let batches    = shuffler::batches_per_epoch(samples, cfg.batch_size);

    tracing::info!(
        "Training {} model: {} samples, {} batches/epoch, {} epochs",
        model.kind(), samples, batches, cfg.epochs
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.epochs {
        let started = Instant::now();
        let mut step = scheduler.step()?;
        let order = shuffler::epoch_permutation(samples, rng);
        let mut loss_sum = 0.0f64;

        for (i, slice) in shuffler::batch_slices(&order, cfg.batch_size).enumerate() {
            let items = slice
                .iter()
                .map(|&s| dataset.get(s).with_context(|| format!("Cannot read training sample {s}")))
                .collect::<Result<Vec<_>>>()?;
            let batch: MotionBatch<B> = batcher.batch(items, device);

            let prediction = model.predict(batch.inputs, true);
            let loss = mse.forward(
                model.output_norm().normalize(prediction),
                model.output_norm().normalize(batch.targets),
                Reduction::Mean,
            );

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;

            // Backward pass, scheduled decay, AdamW update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = decay_weights::<B, M>(model, step.weight_decay);
            model = optim.step(step.lr, model, grads);

            tracing::debug!(
                "Epoch {} batch {}/{} loss={:.6} lr={:.3e} wd={:.3e}",
                epoch + 1, i + 1, batches, loss_val, step.lr, step.weight_decay
            );
            step = scheduler.batch_step()?;
        }

        // ── Epoch checkpoint ──────────────────────────────────────────────────
        ckpt.export(&model, epoch + 1)?;

        let mean_loss = loss_sum / (samples as f64 / cfg.batch_size as f64);
        if !mean_loss.is_finite() {
            tracing::warn!("Epoch {} mean loss is not finite ({})", epoch + 1, mean_loss);
        }
        losses.record(epoch, mean_loss)?;

        let seconds = started.elapsed().as_secs_f64();
        metrics.log(&EpochMetrics::new(epoch + 1, mean_loss, step.lr, seconds))?;

        tracing::info!(
            "Epoch {:>3}/{} | loss={:.6} | lr={:.3e} | {:.1}s",
            epoch + 1, cfg.epochs, mean_loss, step.lr, seconds
        );
    }

    tracing::info!("Training complete!");
    Ok(TrainOutcome { model, losses: losses.losses().to_vec() })
}

// ─── Decoupled weight decay ───────────────────────────────────────────────────
/// Scale every trainable parameter by `1 - weight_decay`.
/// Frozen parameters (the normalizers) are left as they are.
pub fn decay_weights<B, M>(model: M, weight_decay: f64) -> M
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    if weight_decay == 0.0 {
        return model;
    }
    model.map(&mut WeightDecay { keep: 1.0 - weight_decay })
}

struct WeightDecay {
    keep: f64,
}

impl<B: AutodiffBackend> ModuleMapper<B> for WeightDecay {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let (id, tensor, mapper) = param.consume();
        if !tensor.is_require_grad() {
            return Param::from_mapped_value(id, tensor, mapper);
        }
        let decayed = Tensor::from_inner(tensor.inner().mul_scalar(self.keep)).require_grad();
        Param::from_mapped_value(id, decayed, mapper)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::ModelSpec;
    use crate::data::dataset::MotionDataset;
    use crate::domain::{feature_indices::FeatureIndices, norm_stats::NormStats};
    use crate::infra::metrics::{LossLog, LOSS_LOG_FILE, METRICS_FILE};
    use crate::ml::{gating::GatingNetworkConfig, mlp::MlpConfig, model::TrainBackend};
    use rand::{rngs::StdRng, SeedableRng};
    use std::{fmt::Write as _, fs, path::Path};

    /// 64 samples, 4 inputs, 2 outputs: y = (x0 + x1, x2 - x3).
    fn write_dataset(dir: &Path) -> (NormStats, NormStats) {
        let mut rng = StdRng::seed_from_u64(5);
        let (mut xs, mut ys) = (String::new(), String::new());
        for _ in 0..64 {
            let x: Vec<f32> = (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect();
            writeln!(xs, "{} {} {} {}", x[0], x[1], x[2], x[3]).unwrap();
            writeln!(ys, "{} {}", x[0] + x[1], x[2] - x[3]).unwrap();
        }
        fs::write(dir.join("Input.txt"), xs).unwrap();
        fs::write(dir.join("Output.txt"), ys).unwrap();
        (
            NormStats::new(vec![0.0; 4], vec![0.6; 4]).unwrap(),
            NormStats::new(vec![0.0; 2], vec![0.8; 2]).unwrap(),
        )
    }

    fn config(dir: &Path, model: ModelSpec) -> TrainConfig {
        TrainConfig {
            data_dir:   dir.to_path_buf(),
            save_dir:   dir.join("out"),
            epochs:     2,
            batch_size: 32,
            dropout:    0.0,
            model,
            ..TrainConfig::default()
        }
    }

    fn assert_run_artifacts(cfg: &TrainConfig, losses: &[f64]) {
        let ckpt = CheckpointManager::new(&cfg.save_dir).unwrap();
        assert_eq!(ckpt.epochs().unwrap(), vec![1, 2]);
        assert!(ckpt.record_path(1).exists());
        assert!(ckpt.record_path(2).exists());
        assert!(!ckpt.record_path(3).exists());
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);

        let logged = LossLog::read(cfg.save_dir.join(LOSS_LOG_FILE)).unwrap();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged, losses);
        for loss in logged {
            assert!(loss.is_finite() && loss >= 0.0, "bad loss {loss}");
        }

        let csv = fs::read_to_string(cfg.save_dir.join(METRICS_FILE)).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_mlp_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let (in_norm, out_norm) = write_dataset(tmp.path());
        let cfg = config(tmp.path(), ModelSpec::Mlp { hidden: vec![8] });

        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let model = MlpConfig::elu_hidden(vec![4, 8, 2])
            .with_dropout(cfg.dropout)
            .init::<TrainBackend, _>(&in_norm, &out_norm, &mut rng, &device)
            .unwrap();

        let data = MotionDataset::open(tmp.path().join("Input.txt"), tmp.path().join("Output.txt")).unwrap();
        let ckpt = CheckpointManager::new(&cfg.save_dir).unwrap();
        let outcome = run_training(&cfg, model, &data, &mut rng, &ckpt, &device).unwrap();

        assert_run_artifacts(&cfg, &outcome.losses);
        assert_eq!(ckpt.load_manifest(2).unwrap().outputs, vec!["Y"]);
    }

    #[test]
    fn test_gating_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let (in_norm, out_norm) = write_dataset(tmp.path());
        let cfg = config(
            tmp.path(),
            ModelSpec::Gating {
                gating_hidden:  4,
                main_hidden:    8,
                experts:        2,
                gating_indices: FeatureIndices::range(2, 2),
                main_indices:   FeatureIndices::range(0, 2),
            },
        );

        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let model = GatingNetworkConfig::new(vec![2, 3], vec![0, 1])
            .with_gating_hidden(4)
            .with_main_hidden(8)
            .with_experts(2)
            .with_dropout(cfg.dropout)
            .init::<TrainBackend, _>(&in_norm, &out_norm, &mut rng, &device)
            .unwrap();

        let data = MotionDataset::open(tmp.path().join("Input.txt"), tmp.path().join("Output.txt")).unwrap();
        let ckpt = CheckpointManager::new(&cfg.save_dir).unwrap();
        let outcome = run_training(&cfg, model, &data, &mut rng, &ckpt, &device).unwrap();

        assert_run_artifacts(&cfg, &outcome.losses);
        assert_eq!(ckpt.load_manifest(1).unwrap().outputs, vec!["Y", "G", "W0", "W1", "W2"]);
    }

    fn small_mlp(seed: u64) -> crate::ml::mlp::MlpModel<TrainBackend> {
        MlpConfig::elu_hidden(vec![4, 8, 2])
            .with_dropout(0.0)
            .init::<TrainBackend, _>(
                &NormStats::new(vec![0.5; 4], vec![2.0; 4]).unwrap(),
                &NormStats::new(vec![1.0, -1.0], vec![3.0, 0.5]).unwrap(),
                &mut StdRng::seed_from_u64(seed),
                &Default::default(),
            )
            .unwrap()
    }

    fn weights_of<const D: usize>(t: Tensor<TrainBackend, D>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_decay_scales_trainable_weights_only() {
        let model  = small_mlp(9);
        let before = weights_of(model.layers[0].weight.val());

        let decayed = decay_weights::<TrainBackend, _>(model, 0.25);
        let after   = weights_of(decayed.layers[0].weight.val());
        for (a, b) in after.iter().zip(&before) {
            assert_eq!(*a, b * 0.75);
        }
        assert!(decayed.layers[0].weight.val().is_require_grad());

        // Normalizer keeps mean 0.5 / std 2.0
        let x = Tensor::<TrainBackend, 2>::from_floats([[2.5, 2.5, 2.5, 2.5]], &Default::default());
        assert_eq!(weights_of(decayed.input_norm.normalize(x)), vec![1.0; 4]);
    }

    #[test]
    fn test_zero_gradient_step_shrinks_by_decay() {
        let device = Default::default();
        let model  = small_mlp(11);
        let before = weights_of(model.layers[1].weight.val());
        let mut optim = AdamWConfig::new().with_weight_decay(0.0).init::<TrainBackend, _>();

        let x = Tensor::<TrainBackend, 2>::from_floats([[1.0, -2.0, 0.5, 3.0]], &device);
        let loss  = model.predict(x, true).mul_scalar(0.0).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let model = optim.step(1e-3, decay_weights::<TrainBackend, _>(model, 0.1), grads);

        let after = weights_of(model.layers[1].weight.val());
        for (a, b) in after.iter().zip(&before) {
            assert!((a - b * 0.9).abs() <= 1e-6, "{a} vs {}", b * 0.9);
        }
    }

    #[test]
    fn test_non_finite_loss_still_trains_and_exports() {
        let tmp = tempfile::tempdir().unwrap();
        let (in_norm, _) = write_dataset(tmp.path());
        // Zero output deviation: every normalized target is ±inf or NaN
        let out_norm = NormStats::new(vec![0.0; 2], vec![0.0; 2]).unwrap();
        let cfg = config(tmp.path(), ModelSpec::Mlp { hidden: vec![8] });

        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let model = MlpConfig::elu_hidden(vec![4, 8, 2])
            .with_dropout(cfg.dropout)
            .init::<TrainBackend, _>(&in_norm, &out_norm, &mut rng, &device)
            .unwrap();

        let data = MotionDataset::open(tmp.path().join("Input.txt"), tmp.path().join("Output.txt")).unwrap();
        let ckpt = CheckpointManager::new(&cfg.save_dir).unwrap();
        let outcome = run_training(&cfg, model, &data, &mut rng, &ckpt, &device).unwrap();

        assert_eq!(outcome.losses.len(), 2);
        assert!(outcome.losses.iter().all(|l| !l.is_finite()));
        assert_eq!(ckpt.epochs().unwrap(), vec![1, 2]);
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);

        let logged = LossLog::read(cfg.save_dir.join(LOSS_LOG_FILE)).unwrap();
        assert_eq!(logged.len(), 2);
        assert!(logged.iter().all(|l| !l.is_finite()));
    }
}
