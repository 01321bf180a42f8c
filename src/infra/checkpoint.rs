// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// One self-contained snapshot per epoch, never overwritten:
//
//   save_dir/
//     train_config.json   ← run config, written before epoch 1
//     1.mpk.gz            ← full parameter record after epoch 1
//     1.json              ← manifest: kind, dims, tensor names
//     2.mpk.gz
//     2.json
//     ...
//     latest_epoch.json   ← number of the newest complete epoch
//
// Records go through burn's NamedMpkGzFileRecorder at full
// precision; the norm statistics are frozen parameters of the
// model, so every record carries them too.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::ForwardModel;

type Recorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const CONFIG_FILE: &str = "train_config.json";
const LATEST_FILE: &str = "latest_epoch.json";

/// Describes the graph stored next to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointManifest {
    pub epoch:      usize,
    pub kind:       String,
    pub input_dim:  usize,
    pub output_dim: usize,
    pub inputs:     Vec<String>,
    pub outputs:    Vec<String>,
}

impl CheckpointManifest {
    pub fn describe<B: Backend, M: ForwardModel<B>>(model: &M, epoch: usize) -> Self {
        let names = |ns: &[&str]| ns.iter().map(|n| n.to_string()).collect();
        Self {
            epoch,
            kind:       model.kind().to_string(),
            input_dim:  model.input_norm().feature_count(),
            output_dim: model.output_norm().feature_count(),
            inputs:     names(model.input_names()),
            outputs:    names(model.output_names()),
        }
    }
}

/// Saves and restores everything a training run leaves in its directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Opens `dir`, creating it (and its parents) when missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record path without extension; the recorder appends `.mpk.gz`.
    fn record_stem(&self, epoch: usize) -> PathBuf {
        self.dir.join(epoch.to_string())
    }

    pub fn record_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{epoch}.mpk.gz"))
    }

    pub fn manifest_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{epoch}.json"))
    }

    /// Snapshot `model` as epoch `epoch` and move the latest pointer to it.
    pub fn export<B: Backend, M: ForwardModel<B>>(
        &self,
        model: &M,
        epoch: usize,
    ) -> Result<CheckpointManifest> {
        let stem = self.record_stem(epoch);
        model
            .clone()
            .save_file(stem.clone(), &Recorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", stem.display()))?;

        let manifest = CheckpointManifest::describe(model, epoch);
        write_json(&self.manifest_path(epoch), &manifest)?;
        write_json(&self.dir.join(LATEST_FILE), &epoch)?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(manifest)
    }

    /// Restore the parameters of `epoch` into an architecture-matching `model`.
    pub fn load_record<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<M> {
        let stem = self.record_stem(epoch);
        tracing::info!("Loading checkpoint from epoch {}", epoch);
        model.load_file(stem.clone(), &Recorder::new(), device).with_context(|| {
            format!(
                "Cannot load checkpoint '{}'. Have you trained the model first?",
                stem.display()
            )
        })
    }

    pub fn load_manifest(&self, epoch: usize) -> Result<CheckpointManifest> {
        read_json(&self.manifest_path(epoch))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        write_json(&path, cfg)?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        read_json(&self.dir.join(CONFIG_FILE)).with_context(|| {
            format!(
                "No usable training config in '{}'. Run a train command first.",
                self.dir.display()
            )
        })
    }

    /// Newest complete epoch, as recorded by the last `export`.
    pub fn latest_epoch(&self) -> Result<usize> {
        read_json(&self.dir.join(LATEST_FILE))
            .with_context(|| format!("No checkpoint has been written to '{}'", self.dir.display()))
    }

    /// Every epoch with a manifest on disk, ascending.
    pub fn epochs(&self) -> Result<Vec<usize>> {
        let mut epochs = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot list '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(epoch) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse().ok()) {
                epochs.push(epoch);
            }
        }
        epochs.sort_unstable();
        Ok(epochs)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
}
