// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Runs a trained checkpoint over a whole input file:
//   1. Rebuild the model from the training directory
//   2. Index the input file and check its width
//   3. Predict in fixed-size chunks of rows
//   4. Write one whitespace-separated row per sample

use anyhow::{bail, Context, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use crate::data::loader::DataFile;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;

/// Rows pushed through the model per forward pass.
const CHUNK_ROWS: usize = 256;

pub struct PredictUseCase {
    inferencer: Inferencer,
}

impl PredictUseCase {
    pub fn new(save_dir: impl Into<PathBuf>, epoch: Option<usize>) -> Result<Self> {
        let ckpt       = CheckpointManager::new(save_dir)?;
        let inferencer = Inferencer::from_checkpoint(&ckpt, epoch)?;
        Ok(Self { inferencer })
    }

    pub fn inferencer(&self) -> &Inferencer {
        &self.inferencer
    }

    /// Predict every row of `input` into `output`. Returns the row count.
    pub fn run(&self, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Result<usize> {
        let data   = DataFile::open(input)?;
        let output = output.into();

        if !data.is_empty() && data.dim() != self.inferencer.input_dim() {
            bail!(
                "'{}' has {} features per row but the model expects {}",
                data.path().display(),
                data.dim(),
                self.inferencer.input_dim()
            );
        }

        let file = File::create(&output)
            .with_context(|| format!("Cannot create '{}'", output.display()))?;
        let mut writer = BufWriter::new(file);
        let out_dim = self.inferencer.output_dim();

        let order: Vec<usize> = (0..data.len()).collect();
        for chunk in order.chunks(CHUNK_ROWS) {
            let predictions = self.inferencer.predict_rows(data.read_rows(chunk)?)?;
            for row in predictions.chunks(out_dim.max(1)) {
                let line: Vec<String> = row.iter().map(|v| format!("{v:.5}")).collect();
                writeln!(writer, "{}", line.join(" "))?;
            }
            tracing::debug!("Predicted {} rows", chunk.len());
        }
        writer.flush()?;

        tracing::info!("Wrote {} predictions to '{}'", data.len(), output.display());
        Ok(data.len())
    }
}
