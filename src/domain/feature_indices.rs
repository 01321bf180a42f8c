// ============================================================
// Layer 3 — Feature Index Partitions
// ============================================================
// The gating network reads two fixed subsets of the input vector:
//   - the gating subset (fed to the expert-selection network)
//   - the main subset   (fed to the expert-blended layers)
//
// Subsets are written on the command line as comma-separated
// indices and inclusive ranges, e.g. "0-692" or "1,4,10-12".
// Order is preserved exactly as written; duplicates are kept,
// since slicing the same feature twice is a legal (if odd) setup.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// An ordered list of input feature indices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureIndices(Vec<usize>);

impl FeatureIndices {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// The contiguous block `start..start + len`.
    pub fn range(start: usize, len: usize) -> Self {
        Self((start..start + len).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Largest index, if any.
    pub fn max(&self) -> Option<usize> {
        self.0.iter().copied().max()
    }
}

impl FromStr for FeatureIndices {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut indices = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('-') {
                Some((lo, hi)) => {
                    let lo: usize = lo.trim().parse()
                        .with_context(|| format!("bad range start in '{part}'"))?;
                    let hi: usize = hi.trim().parse()
                        .with_context(|| format!("bad range end in '{part}'"))?;
                    if hi < lo {
                        bail!("range '{part}' is descending");
                    }
                    indices.extend(lo..=hi);
                }
                None => {
                    indices.push(part.parse()
                        .with_context(|| format!("bad feature index '{part}'"))?);
                }
            }
        }
        Ok(Self(indices))
    }
}

impl fmt::Display for FeatureIndices {
    /// Compresses consecutive runs back into `lo-hi` ranges.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let mut i = 0;
        while i < self.0.len() {
            let start = self.0[i];
            let mut end = start;
            while i + 1 < self.0.len() && self.0[i + 1] == end + 1 {
                end += 1;
                i += 1;
            }
            parts.push(if end > start { format!("{start}-{end}") } else { start.to_string() });
            i += 1;
        }
        write!(f, "{}", parts.join(","))
    }
}
