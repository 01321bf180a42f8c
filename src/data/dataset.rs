// ============================================================
// Layer 4 — Motion Dataset
// ============================================================
// Pairs the input file with the output file. Sample i is record
// i of both, so the two files must have the same record count.
//
// Implements Burn's Dataset trait: `get(i)` seeks to record i in
// each file and parses one MotionSample. Nothing is cached, so
// the dataset stays the size of its two offset tables.
//
// Reference: Burn Book §4 (Dataset)

use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::loader::DataFile;

/// One (input, target) row pair, both raw and un-normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub inputs:  Vec<f32>,
    pub targets: Vec<f32>,
}

pub struct MotionDataset {
    inputs:  DataFile,
    outputs: DataFile,
}

impl MotionDataset {
    pub fn open(input_path: impl AsRef<Path>, output_path: impl AsRef<Path>) -> Result<Self> {
        let inputs  = DataFile::open(input_path.as_ref())?;
        let outputs = DataFile::open(output_path.as_ref())?;

        if inputs.len() != outputs.len() {
            bail!(
                "'{}' has {} samples but '{}' has {}",
                inputs.path().display(),
                inputs.len(),
                outputs.path().display(),
                outputs.len()
            );
        }
        Ok(Self { inputs, outputs })
    }

    pub fn sample_count(&self) -> usize {
        self.inputs.len()
    }

    /// Width of one input row.
    pub fn input_dim(&self) -> usize {
        self.inputs.dim()
    }

    /// Width of one target row.
    pub fn output_dim(&self) -> usize {
        self.outputs.dim()
    }

    /// Read sample `index`, reporting why it could not be read.
    pub fn sample(&self, index: usize) -> Result<MotionSample> {
        Ok(MotionSample {
            inputs:  self.inputs.read_rows(&[index])?,
            targets: self.outputs.read_rows(&[index])?,
        })
    }
}

// ─── Burn Dataset Trait Implementation ────────────────────────────────────────
impl Dataset<MotionSample> for MotionDataset {
    fn get(&self, index: usize) -> Option<MotionSample> {
        if index >= self.sample_count() {
            return None;
        }
        match self.sample(index) {
            Ok(sample) => Some(sample),
            Err(e) => {
                tracing::error!("Cannot read sample {}: {:#}", index, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.sample_count()
    }
}
