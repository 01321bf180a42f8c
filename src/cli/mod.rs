// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train-mlp`    : trains a multilayer perceptron
//   2. `train-gating` : trains a mixture-of-experts network
//   3. `predict`      : runs a checkpoint over an input file
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs};

use crate::application::train_use_case::{TrainConfig, TrainUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "motion-inbetween",
    version,
    about = "Train motion in-betweening networks (MLP or mixture of experts) and run them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::TrainMlp(args)    => run_train(args.into()),
            Commands::TrainGating(args) => run_train(args.into()),
            Commands::Predict(args)     => run_predict(args),
        }
    }
}

fn run_train(cfg: TrainConfig) -> Result<()> {
    tracing::info!(
        "Starting {} training on '{}' → '{}'",
        cfg.model.kind(),
        cfg.data_dir.display(),
        cfg.save_dir.display()
    );

    let use_case = TrainUseCase::new(cfg);
    let losses = use_case.execute()?;

    if let Some(last) = losses.last() {
        println!("Training complete. Final loss {last:.6}, checkpoints in '{}'.", use_case.save_dir().display());
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::new(&args.save_dir, args.epoch)?;
    let rows = use_case.run(&args.input, &args.output)?;

    println!("Wrote {rows} predictions to '{}'.", args.output.display());
    Ok(())
}
