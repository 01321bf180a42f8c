// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds a trained network from its save directory and runs
// it without autodiff or dropout.
//
//   train_config.json → architecture
//   {epoch}.json      → input/output widths
//   {epoch}.mpk.gz    → parameters (norm statistics included)
//
// The freshly built model is a placeholder: its random weights
// and identity norms are fully replaced by the loaded record.

use anyhow::{bail, Result};
use burn::{prelude::*, tensor::TensorData};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::ModelSpec;
use crate::domain::norm_stats::NormStats;
use crate::infra::checkpoint::{CheckpointManager, CheckpointManifest};
use crate::ml::{
    gating::GatingNetwork,
    mlp::MlpModel,
    model::{default_device, ForwardModel, InferBackend},
};

pub enum LoadedModel {
    Mlp(MlpModel<InferBackend>),
    Gating(GatingNetwork<InferBackend>),
}

impl LoadedModel {
    fn predict(&self, x: Tensor<InferBackend, 2>) -> Tensor<InferBackend, 2> {
        match self {
            LoadedModel::Mlp(m)    => m.predict(x, false),
            LoadedModel::Gating(m) => m.predict(x, false),
        }
    }
}

pub struct Inferencer {
    model:    LoadedModel,
    manifest: CheckpointManifest,
    device:   <InferBackend as Backend>::Device,
}

impl Inferencer {
    /// Load `epoch`, or the latest complete epoch when `None`.
    pub fn from_checkpoint(ckpt: &CheckpointManager, epoch: Option<usize>) -> Result<Self> {
        let device   = default_device();
        let cfg      = ckpt.load_config()?;
        let epoch    = match epoch {
            Some(e) => e,
            None    => ckpt.latest_epoch()?,
        };
        let manifest = ckpt.load_manifest(epoch)?;

        if manifest.kind != cfg.model.kind() {
            bail!(
                "checkpoint {} holds a '{}' model but the run config describes '{}'",
                epoch, manifest.kind, cfg.model.kind()
            );
        }

        let input_norm  = NormStats::identity(manifest.input_dim);
        let output_norm = NormStats::identity(manifest.output_dim);
        let mut rng     = StdRng::seed_from_u64(cfg.seed);

        let model = match &cfg.model {
            ModelSpec::Mlp { hidden } => {
                let model = ModelSpec::mlp_config(hidden, manifest.input_dim, manifest.output_dim, 0.0)
                    .init::<InferBackend, _>(&input_norm, &output_norm, &mut rng, &device)?;
                LoadedModel::Mlp(ckpt.load_record(model, epoch, &device)?)
            }
            ModelSpec::Gating { gating_hidden, main_hidden, experts, gating_indices, main_indices } => {
                let model = ModelSpec::gating_config(
                    *gating_hidden, *main_hidden, *experts, gating_indices, main_indices, 0.0,
                )
                .init::<InferBackend, _>(&input_norm, &output_norm, &mut rng, &device)?;
                LoadedModel::Gating(ckpt.load_record(model, epoch, &device)?)
            }
        };

        tracing::info!("{} model loaded from epoch {}", manifest.kind, epoch);
        Ok(Self { model, manifest, device })
    }

    pub fn manifest(&self) -> &CheckpointManifest {
        &self.manifest
    }

    pub fn input_dim(&self) -> usize {
        self.manifest.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.manifest.output_dim
    }

    /// Raw rows [n, input_dim] → renormalized predictions [n, output_dim].
    pub fn predict(&self, x: Tensor<InferBackend, 2>) -> Tensor<InferBackend, 2> {
        self.model.predict(x)
    }

    /// Flat row-major inputs in, flat row-major predictions out.
    pub fn predict_rows(&self, inputs: Vec<f32>) -> Result<Vec<f32>> {
        let dim = self.input_dim();
        if dim == 0 || inputs.len() % dim != 0 {
            bail!("{} values do not form rows of width {}", inputs.len(), dim);
        }
        let n = inputs.len() / dim;
        let x = Tensor::<InferBackend, 2>::from_data(TensorData::new(inputs, [n, dim]), &self.device);

        self.predict(x)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Prediction readback: {e:?}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::gating::GatingNetworkConfig;

    fn save_run(dir: &std::path::Path, model: ModelSpec) -> (CheckpointManager, TrainConfig) {
        let ckpt = CheckpointManager::new(dir).unwrap();
        let cfg = TrainConfig { save_dir: dir.to_path_buf(), model, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        (ckpt, cfg)
    }

    #[test]
    fn test_mlp_checkpoint_reproduces_predictions() {
        let tmp = tempfile::tempdir().unwrap();
        let (ckpt, cfg) = save_run(tmp.path(), ModelSpec::Mlp { hidden: vec![5] });

        let device = default_device();
        let trained = ModelSpec::mlp_config(&[5], 3, 2, 0.0)
            .init::<InferBackend, _>(
                &NormStats::new(vec![1.0, 2.0, 3.0], vec![0.5, 0.5, 2.0]).unwrap(),
                &NormStats::new(vec![-1.0, 4.0], vec![3.0, 0.25]).unwrap(),
                &mut StdRng::seed_from_u64(cfg.seed + 1),
                &device,
            )
            .unwrap();
        ckpt.export(&trained, 1).unwrap();

        let rows = vec![0.5, 1.5, -2.0, 3.0, 0.0, 1.0];
        let x = Tensor::<InferBackend, 2>::from_data(TensorData::new(rows.clone(), [2, 3]), &device);
        let want: Vec<f32> = trained.forward(x, false).into_data().to_vec().unwrap();

        let inferencer = Inferencer::from_checkpoint(&ckpt, None).unwrap();
        assert_eq!((inferencer.input_dim(), inferencer.output_dim()), (3, 2));
        assert_eq!(inferencer.predict_rows(rows).unwrap(), want);
    }

    #[test]
    fn test_gating_checkpoint_loads_by_epoch() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = ModelSpec::Gating {
            gating_hidden:  3,
            main_hidden:    4,
            experts:        2,
            gating_indices: "3".parse().unwrap(),
            main_indices:   "0-2".parse().unwrap(),
        };
        let (ckpt, _) = save_run(tmp.path(), spec);

        let device = default_device();
        let model = GatingNetworkConfig::new(vec![3], vec![0, 1, 2])
            .with_gating_hidden(3)
            .with_main_hidden(4)
            .with_experts(2)
            .init::<InferBackend, _>(&NormStats::identity(4), &NormStats::identity(1), &mut StdRng::seed_from_u64(3), &device)
            .unwrap();
        ckpt.export(&model, 1).unwrap();
        ckpt.export(&model, 2).unwrap();

        let inferencer = Inferencer::from_checkpoint(&ckpt, Some(1)).unwrap();
        assert_eq!(inferencer.manifest().epoch, 1);
        assert_eq!(inferencer.predict_rows(vec![0.1, 0.2, 0.3, 0.4]).unwrap().len(), 1);
        assert!(inferencer.predict_rows(vec![0.1, 0.2, 0.3]).is_err());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (ckpt, _) = save_run(tmp.path(), ModelSpec::Mlp { hidden: vec![4] });

        let gating = GatingNetworkConfig::new(vec![1], vec![0])
            .init::<InferBackend, _>(&NormStats::identity(2), &NormStats::identity(1), &mut StdRng::seed_from_u64(0), &default_device())
            .unwrap();
        ckpt.export(&gating, 1).unwrap();

        assert!(Inferencer::from_checkpoint(&ckpt, None).is_err());
    }
}
