// ============================================================
// Layer 6 — Training Logs
// ============================================================
// Two per-epoch records of a run, both in the save directory:
//
//   error_train.bin: one little-endian f64 mean loss per
//                     configured epoch, zero until reached,
//                     rewritten whole after every epoch
//
//   metrics.csv    : human-readable row per epoch:
//                       epoch,mean_loss,learning_rate,seconds
//                       1,0.981203,0.000100000,0.412
//                       2,0.874410,0.000097553,0.398
//                     appended, so a rerun into the same
//                     directory keeps earlier rows
//
// How to read the metrics:
//   - mean_loss is measured on normalized outputs; ~1.0 means
//     the model is no better than predicting the mean pose
//   - learning_rate drops along a cosine and jumps back up at
//     every warm restart

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const LOSS_LOG_FILE: &str = "error_train.bin";
pub const METRICS_FILE:  &str = "metrics.csv";

/// Fixed-length binary log of per-epoch mean losses.
#[derive(Debug, Clone)]
pub struct LossLog {
    path:   PathBuf,
    losses: Vec<f64>,
}

impl LossLog {
    /// One zero entry per epoch; nothing is written until the first `record`.
    pub fn new(dir: impl AsRef<Path>, epochs: usize) -> Self {
        Self {
            path:   dir.as_ref().join(LOSS_LOG_FILE),
            losses: vec![0.0; epochs],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn losses(&self) -> &[f64] {
        &self.losses
    }

    /// Store the mean loss of `epoch` (0-based) and rewrite the file.
    pub fn record(&mut self, epoch: usize, mean_loss: f64) -> Result<()> {
        let Some(slot) = self.losses.get_mut(epoch) else {
            bail!("epoch {epoch} is outside the {}-epoch loss log", self.losses.len());
        };
        *slot = mean_loss;

        let bytes: Vec<u8> = self.losses.iter().flat_map(|l| l.to_le_bytes()).collect();
        fs::write(&self.path, bytes)
            .with_context(|| format!("Cannot write loss log '{}'", self.path.display()))
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Vec<f64>> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read loss log '{}'", path.display()))?;
        if bytes.len() % 8 != 0 {
            bail!("Loss log '{}' is {} bytes, not a whole number of f64 values", path.display(), bytes.len());
        }
        Ok(bytes
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Running loss sum over the epoch divided by samples / batch size
    pub mean_loss: f64,

    /// Learning rate after the epoch's final scheduler step
    pub learning_rate: f64,

    /// Wall-clock time spent on the epoch
    pub seconds: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, mean_loss: f64, learning_rate: f64, seconds: f64) -> Self {
        Self { epoch, mean_loss, learning_rate, seconds }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join(METRICS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,mean_loss,learning_rate,seconds")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6},{:.9},{:.3}", m.epoch, m.mean_loss, m.learning_rate, m.seconds)?;

        tracing::debug!("Logged epoch {} metrics: mean_loss={:.4}", m.epoch, m.mean_loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
