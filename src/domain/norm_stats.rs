// ============================================================
// Layer 3 — NormStats Domain Type
// ============================================================
// Per-feature mean and deviation vectors used to standardize
// network inputs and to invert the standardization on outputs.
//
// On disk the statistics are two whitespace-separated rows:
//   line 1: mean of every feature
//   line 2: standard deviation of every feature
//
// The exporter that writes these files already replaces zero
// deviations with 1. A zero that slips through is NOT patched
// here (normalize() would divide by it), so parse() only
// reports how many degenerate features it found.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Mean / deviation pair for a feature vector of fixed width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    mean: Vec<f32>,
    std:  Vec<f32>,
}

impl NormStats {
    /// Build statistics from explicit vectors.
    /// Fails when the two vectors have different lengths.
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self> {
        if mean.len() != std.len() {
            bail!(
                "mean has {} values but deviation has {}",
                mean.len(),
                std.len()
            );
        }
        Ok(Self { mean, std })
    }

    /// Parse the two-row text format.
    /// Blank lines are skipped; rows beyond the second are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| parse_row(line).with_context(|| format!("norm row {}", i + 1)));

        let mean = match rows.next() {
            Some(row) => row?,
            None => bail!("norm data is empty"),
        };
        let std = match rows.next() {
            Some(row) => row?,
            None => bail!("norm data has a mean row but no deviation row"),
        };
        Self::new(mean, std)
    }

    /// Statistics that leave values unchanged (mean 0, deviation 1).
    pub fn identity(features: usize) -> Self {
        Self { mean: vec![0.0; features], std: vec![1.0; features] }
    }

    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    pub fn std(&self) -> &[f32] {
        &self.std
    }

    /// Number of features whose deviation is exactly zero.
    pub fn degenerate_count(&self) -> usize {
        self.std.iter().filter(|&&s| s == 0.0).count()
    }
}

/// Parse one whitespace-separated row of floats.
pub fn parse_row(line: &str) -> Result<Vec<f32>> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .with_context(|| format!("'{token}' is not a number"))
        })
        .collect()
}
