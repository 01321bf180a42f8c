// ============================================================
// Layer 4 — Data File Loader
// ============================================================
// Reads the two kinds of text file a training run consumes:
//
//   Input.txt / Output.txt          : one sample per line,
//                                      whitespace-separated floats
//   InputNorm.txt / OutputNorm.txt  : mean row + deviation row
//
// Data files are never loaded whole. A DataFile holds the
// SampleIndex and one open reader, and seeks to each requested
// row on demand.
//
// Reference: Rust Book §9 (Error Handling), §12 (I/O)

use anyhow::{anyhow, bail, Context, Result};
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::data::sample_index::SampleIndex;
use crate::domain::norm_stats::{parse_row, NormStats};

/// Load a two-row normalization file.
pub fn load_norm(path: impl AsRef<Path>) -> Result<NormStats> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read norm file '{}'", path.display()))?;
    let stats = NormStats::parse(&text)
        .with_context(|| format!("Malformed norm file '{}'", path.display()))?;

    let degenerate = stats.degenerate_count();
    if degenerate > 0 {
        tracing::warn!(
            "{} of {} features in '{}' have zero deviation; normalizing them divides by zero",
            degenerate,
            stats.feature_count(),
            path.display()
        );
    }
    tracing::debug!("Loaded {} norm features from '{}'", stats.feature_count(), path.display());
    Ok(stats)
}

/// A flat sample file plus its byte-offset index.
#[derive(Debug)]
pub struct DataFile {
    path:   PathBuf,
    index:  SampleIndex,
    dim:    usize,
    reader: Mutex<BufReader<File>>,
}

impl DataFile {
    /// Index `path` and infer the row width from its first record.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path  = path.into();
        let index = SampleIndex::build(&path)?;

        let file = File::open(&path)
            .with_context(|| format!("Cannot open data file '{}'", path.display()))?;
        let mut reader = BufReader::new(file);

        let dim = if index.is_empty() {
            0
        } else {
            let first = index.read_record(&mut reader, 0)?;
            parse_line(&first)
                .with_context(|| format!("Bad first row in '{}'", path.display()))?
                .len()
        };

        tracing::info!(
            "Indexed '{}': {} samples × {} features",
            path.display(),
            index.len(),
            dim
        );
        Ok(Self { path, index, dim, reader: Mutex::new(reader) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Width of every row.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Append the rows at `indices` to `out`, row-major, in order.
    pub fn read_rows_into(&self, indices: &[usize], out: &mut Vec<f32>) -> Result<()> {
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| anyhow!("reader of '{}' was poisoned by a panic", self.path.display()))?;
        out.reserve(indices.len() * self.dim);

        for &i in indices {
            let bytes = self.index.read_record(&mut *reader, i)
                .with_context(|| format!("Cannot read sample {i} from '{}'", self.path.display()))?;
            let row = parse_line(&bytes)
                .with_context(|| format!("Bad sample {i} in '{}'", self.path.display()))?;
            if row.len() != self.dim {
                bail!(
                    "sample {i} in '{}' has {} values, expected {}",
                    self.path.display(),
                    row.len(),
                    self.dim
                );
            }
            out.extend_from_slice(&row);
        }
        Ok(())
    }

    /// Read the rows at `indices` into a fresh buffer.
    pub fn read_rows(&self, indices: &[usize]) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(indices.len() * self.dim);
        self.read_rows_into(indices, &mut out)?;
        Ok(out)
    }
}

fn parse_line(bytes: &[u8]) -> Result<Vec<f32>> {
    let line = std::str::from_utf8(bytes).context("row is not valid UTF-8")?;
    parse_row(line)
}
