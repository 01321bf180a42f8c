// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and all their flags:
//   train-mlp     plain multilayer perceptron
//   train-gating  mixture-of-experts gating network
//   predict       run a trained checkpoint over a data file
//
// The flags shared by both trainers live in CommonArgs and are
// flattened into each training subcommand.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::{ModelSpec, TrainConfig};
use crate::domain::feature_indices::FeatureIndices;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a multilayer perceptron
    TrainMlp(TrainMlpArgs),

    /// Train a mixture-of-experts gating network
    TrainGating(TrainGatingArgs),

    /// Predict outputs for every row of an input file
    Predict(PredictArgs),
}

/// Flags every training run takes.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Directory holding Input.txt, Output.txt, InputNorm.txt and OutputNorm.txt
    #[arg(long, default_value = "Data")]
    pub data_dir: PathBuf,

    /// Directory for checkpoints, config and loss logs
    #[arg(long, default_value = "Training")]
    pub save_dir: PathBuf,

    /// Seed for initialization, dropout and shuffling
    #[arg(long, default_value_t = 23456)]
    pub seed: u64,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 150)]
    pub epochs: usize,

    /// Samples per optimizer step
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Probability of zeroing an activation during training
    #[arg(long, default_value_t = 0.3)]
    pub dropout: f64,

    /// Peak learning rate of every cosine cycle
    #[arg(long, default_value_t = 1e-4)]
    pub learning_rate: f64,

    /// AdamW decoupled weight decay
    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f64,

    /// Epochs in the first cosine cycle
    #[arg(long, default_value_t = 10)]
    pub restart_period: usize,

    /// Growth factor of the cycle length at every restart
    #[arg(long, default_value_t = 2.0)]
    pub restart_mult: f64,
}

impl CommonArgs {
    fn into_config(self, model: ModelSpec) -> TrainConfig {
        TrainConfig {
            data_dir:       self.data_dir,
            save_dir:       self.save_dir,
            seed:           self.seed,
            epochs:         self.epochs,
            batch_size:     self.batch_size,
            dropout:        self.dropout,
            learning_rate:  self.learning_rate,
            weight_decay:   self.weight_decay,
            restart_period: self.restart_period,
            restart_mult:   self.restart_mult,
            model,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainMlpArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Hidden layer widths, comma separated
    #[arg(long, value_delimiter = ',', default_value = "512,512")]
    pub hidden: Vec<usize>,
}

impl From<TrainMlpArgs> for TrainConfig {
    fn from(a: TrainMlpArgs) -> Self {
        a.common.into_config(ModelSpec::Mlp { hidden: a.hidden })
    }
}

#[derive(Args, Debug)]
pub struct TrainGatingArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Width of the two hidden gating layers
    #[arg(long, default_value_t = 128)]
    pub gating_hidden: usize,

    /// Width of the two hidden expert layers
    #[arg(long, default_value_t = 512)]
    pub main_hidden: usize,

    /// Number of experts blended per sample
    #[arg(long, default_value_t = 8)]
    pub experts: usize,

    /// Input features driving expert selection, e.g. "693-822"
    #[arg(long, default_value = "693-822")]
    pub gating_indices: FeatureIndices,

    /// Input features fed through the experts, e.g. "0-692"
    #[arg(long, default_value = "0-692")]
    pub main_indices: FeatureIndices,
}

impl From<TrainGatingArgs> for TrainConfig {
    fn from(a: TrainGatingArgs) -> Self {
        a.common.into_config(ModelSpec::Gating {
            gating_hidden:  a.gating_hidden,
            main_hidden:    a.main_hidden,
            experts:        a.experts,
            gating_indices: a.gating_indices,
            main_indices:   a.main_indices,
        })
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Training directory with train_config.json and checkpoints
    #[arg(long, default_value = "Training")]
    pub save_dir: PathBuf,

    /// Epoch to load; the latest complete epoch when omitted
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Input rows, same layout as Input.txt
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the predicted rows
    #[arg(long, default_value = "Prediction.txt")]
    pub output: PathBuf,
}
