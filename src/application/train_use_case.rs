// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load norm statistics      (Layer 4 - data)
//   Step 2: Index the sample files    (Layer 4 - data)
//   Step 3: Check widths agree        (Layer 2)
//   Step 4: Seed the rng and backend  (Layer 2)
//   Step 5: Save config               (Layer 6 - infra)
//   Step 6: Build the model           (Layer 5 - ml)
//   Step 7: Run training loop         (Layer 5 - ml)
//
// Expected files in data_dir:
//   Input.txt, Output.txt           one sample per line
//   InputNorm.txt, OutputNorm.txt   mean row, std row
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::{module::AutodiffModule, prelude::Backend};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{dataset::MotionDataset, loader::load_norm};
use crate::domain::{feature_indices::FeatureIndices, norm_stats::NormStats};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    gating::GatingNetworkConfig,
    mlp::MlpConfig,
    model::{default_device, ForwardModel, TrainBackend},
    trainer::run_training,
};

pub const INPUT_FILE:       &str = "Input.txt";
pub const OUTPUT_FILE:      &str = "Output.txt";
pub const INPUT_NORM_FILE:  &str = "InputNorm.txt";
pub const OUTPUT_NORM_FILE: &str = "OutputNorm.txt";

// ─── Model Architecture ──────────────────────────────────────────────────────
/// Which network to train, with its architecture knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// ELU hidden layers of the given widths, linear output.
    Mlp { hidden: Vec<usize> },

    /// Mixture of experts over two input partitions.
    Gating {
        gating_hidden:  usize,
        main_hidden:    usize,
        experts:        usize,
        gating_indices: FeatureIndices,
        main_indices:   FeatureIndices,
    },
}

impl ModelSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelSpec::Mlp { .. }    => "mlp",
            ModelSpec::Gating { .. } => "gating",
        }
    }

    /// `input → hidden… → output` with ELU between.
    pub fn mlp_config(hidden: &[usize], input_dim: usize, output_dim: usize, dropout: f64) -> MlpConfig {
        let mut layers = Vec::with_capacity(hidden.len() + 2);
        layers.push(input_dim);
        layers.extend_from_slice(hidden);
        layers.push(output_dim);
        MlpConfig::elu_hidden(layers).with_dropout(dropout)
    }

    pub fn gating_config(
        gating_hidden:  usize,
        main_hidden:    usize,
        experts:        usize,
        gating_indices: &FeatureIndices,
        main_indices:   &FeatureIndices,
        dropout:        f64,
    ) -> GatingNetworkConfig {
        GatingNetworkConfig::new(gating_indices.as_slice().to_vec(), main_indices.as_slice().to_vec())
            .with_gating_hidden(gating_hidden)
            .with_main_hidden(main_hidden)
            .with_experts(experts)
            .with_dropout(dropout)
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All knobs of a training run.
// Serialisable so it can be saved to disk and reloaded for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       PathBuf,
    pub save_dir:       PathBuf,
    pub seed:           u64,
    pub epochs:         usize,
    pub batch_size:     usize,
    pub dropout:        f64,
    pub learning_rate:  f64,
    pub weight_decay:   f64,
    pub restart_period: usize,
    pub restart_mult:   f64,
    pub model:          ModelSpec,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       PathBuf::from("Data"),
            save_dir:       PathBuf::from("Training"),
            seed:           23456,
            epochs:         150,
            batch_size:     32,
            dropout:        0.3,
            learning_rate:  1e-4,
            weight_decay:   1e-4,
            restart_period: 10,
            restart_mult:   2.0,
            model:          ModelSpec::Mlp { hidden: vec![512, 512] },
        }
    }
}

impl TrainConfig {
    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    /// Returns the per-epoch mean losses.
    pub fn execute(&self) -> Result<Vec<f64>> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("batch size must be at least 1");
        }

        // ── Step 1: Norm statistics ───────────────────────────────────────────
        tracing::info!("Loading data from '{}'", cfg.data_dir.display());
        let input_norm  = load_norm(cfg.data_file(INPUT_NORM_FILE))?;
        let output_norm = load_norm(cfg.data_file(OUTPUT_NORM_FILE))?;

        // ── Step 2: Sample files ──────────────────────────────────────────────
        let dataset = MotionDataset::open(cfg.data_file(INPUT_FILE), cfg.data_file(OUTPUT_FILE))?;
        tracing::info!(
            "Indexed {} samples ({} inputs → {} outputs)",
            dataset.sample_count(),
            dataset.input_dim(),
            dataset.output_dim()
        );

        // ── Step 3: Widths must agree ─────────────────────────────────────────
        check_width("input", &input_norm, dataset.input_dim())?;
        check_width("output", &output_norm, dataset.output_dim())?;

        // ── Step 4: One seed for init, shuffling and dropout masks ────────────
        // StdRng drives initialization and the epoch order; the backend's
        // own generator draws the dropout masks.
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let device  = default_device();
        TrainBackend::seed(&device, cfg.seed);

        // ── Step 5: Config for inference ──────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.save_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 6 + 7: Build the model and train it ─────────────────────────
        match &cfg.model {
            ModelSpec::Mlp { hidden } => {
                let model = ModelSpec::mlp_config(hidden, input_norm.feature_count(), output_norm.feature_count(), cfg.dropout)
                    .init::<TrainBackend, _>(&input_norm, &output_norm, &mut rng, &device)?;
                train(cfg, model, &dataset, &mut rng, &ckpt, &device)
            }
            ModelSpec::Gating { gating_hidden, main_hidden, experts, gating_indices, main_indices } => {
                let model = ModelSpec::gating_config(
                    *gating_hidden, *main_hidden, *experts, gating_indices, main_indices, cfg.dropout,
                )
                .init::<TrainBackend, _>(&input_norm, &output_norm, &mut rng, &device)?;
                train(cfg, model, &dataset, &mut rng, &ckpt, &device)
            }
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.config.save_dir
    }
}

fn train<M>(
    cfg:     &TrainConfig,
    model:   M,
    dataset: &MotionDataset,
    rng:     &mut StdRng,
    ckpt:    &CheckpointManager,
    device:  &<TrainBackend as Backend>::Device,
) -> Result<Vec<f64>>
where
    M: ForwardModel<TrainBackend> + AutodiffModule<TrainBackend>,
{
    let outcome = run_training(cfg, model, dataset, rng, ckpt, device)?;
    Ok(outcome.losses)
}

fn check_width(what: &str, norm: &NormStats, data_dim: usize) -> Result<()> {
    if norm.feature_count() != data_dim {
        bail!(
            "{what} norm has {} features but {what} rows have {data_dim}",
            norm.feature_count()
        );
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_data(dir: &Path, input_norm: &str) {
        let xs: String = (0..10).map(|i| format!("{} {} {}\n", i, i * 2, -i)).collect();
        let ys: String = (0..10).map(|i| format!("{}\n", i * 3)).collect();
        fs::write(dir.join(INPUT_FILE), xs).unwrap();
        fs::write(dir.join(OUTPUT_FILE), ys).unwrap();
        fs::write(dir.join(INPUT_NORM_FILE), input_norm).unwrap();
        fs::write(dir.join(OUTPUT_NORM_FILE), "13.5\n8.6\n").unwrap();
    }

    fn config(dir: &Path, model: ModelSpec) -> TrainConfig {
        TrainConfig {
            data_dir:   dir.to_path_buf(),
            save_dir:   dir.join("run"),
            epochs:     1,
            batch_size: 4,
            dropout:    0.0,
            model,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_defaults_match_reference_runs() {
        let cfg = TrainConfig::default();
        assert_eq!((cfg.seed, cfg.epochs, cfg.batch_size), (23456, 150, 32));
        assert_eq!(cfg.restart_period, 10);
        assert_eq!(cfg.model, ModelSpec::Mlp { hidden: vec![512, 512] });
    }

    #[test]
    fn test_mlp_config_layers() {
        let cfg = ModelSpec::mlp_config(&[16, 8], 5, 2, 0.1);
        assert_eq!(cfg.layers, vec![5, 16, 8, 2]);
        assert_eq!(cfg.activations.iter().filter(|a| a.is_some()).count(), 2);
        assert!(cfg.activations[2].is_none());
    }

    #[test]
    fn test_config_json_keeps_model_kind() {
        let cfg = TrainConfig {
            model: ModelSpec::Gating {
                gating_hidden:  4,
                main_hidden:    8,
                experts:        2,
                gating_indices: "2".parse().unwrap(),
                main_indices:   "0-1".parse().unwrap(),
            },
            ..TrainConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"kind\":\"gating\""));
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model, cfg.model);
    }

    #[test]
    fn test_execute_trains_and_saves_config() {
        let tmp = tempfile::tempdir().unwrap();
        write_data(tmp.path(), "4.5 9 -4.5\n2.9 5.7 2.9\n");
        let cfg = config(tmp.path(), ModelSpec::Mlp { hidden: vec![6] });

        let losses = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(losses.len(), 1);

        let ckpt = CheckpointManager::new(&cfg.save_dir).unwrap();
        assert_eq!(ckpt.load_config().unwrap().model, cfg.model);
        assert_eq!(ckpt.latest_epoch().unwrap(), 1);
    }

    #[test]
    fn test_same_seed_reproduces_losses_with_dropout() {
        let tmp = tempfile::tempdir().unwrap();
        write_data(tmp.path(), "4.5 9 -4.5\n2.9 5.7 2.9\n");
        let run = |name: &str| {
            let cfg = TrainConfig {
                save_dir: tmp.path().join(name),
                epochs:   2,
                dropout:  0.3,
                ..config(tmp.path(), ModelSpec::Mlp { hidden: vec![6] })
            };
            TrainUseCase::new(cfg).execute().unwrap()
        };

        let first  = run("first");
        let second = run("second");
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_norm_width_mismatch_fails() {
        let tmp = tempfile::tempdir().unwrap();
        write_data(tmp.path(), "0 0\n1 1\n");
        let cfg = config(tmp.path(), ModelSpec::Mlp { hidden: vec![6] });
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_missing_data_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&tmp.path().join("absent"), ModelSpec::Mlp { hidden: vec![6] });
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
