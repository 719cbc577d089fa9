//! Run configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toxeval_classifiers::{ArchKind, ArchSpec, DeviceSpec};
use toxeval_core::{Error, Result, NUM_CATEGORIES};
use toxeval_data::{BatchConfig, DatasetKind, DatasetSpec};

/// Evaluation run configuration, as saved alongside a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Run name
    #[serde(default = "default_name")]
    pub name: String,

    /// Model architecture
    pub arch: ArchSpec,

    /// Test dataset
    pub dataset: DatasetSpec,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent input-preparation workers
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Device selection; absent means CPU
    #[serde(default)]
    pub gpus: Option<DeviceSelector>,

    /// Set once `gpus` came from the command line and `CUDA_VISIBLE_DEVICES`
    /// was scoped to it
    #[serde(skip)]
    pub visible_devices_scoped: bool,
}

/// `gpus` value: a GPU count or a device name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceSelector {
    Count(usize),
    Name(String),
}

fn default_name() -> String {
    "toxeval".to_string()
}

fn default_batch_size() -> usize {
    BatchConfig::default().batch_size
}

fn default_num_workers() -> usize {
    BatchConfig::default().num_workers
}

/// Command-line values that replace config entries
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub test_csv: Option<PathBuf>,
    pub device: Option<String>,
    pub batch_size: Option<usize>,
    pub num_workers: Option<usize>,
}

impl EvalConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let config = match extension.as_str() {
            "json" => serde_json::from_str(&content).map_err(|e| {
                Error::config(format!("Failed to parse config {}: {}", path.display(), e))
            })?,
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| {
                Error::config(format!("Failed to parse config {}: {}", path.display(), e))
            })?,
            other => {
                return Err(Error::config(format!(
                    "Unsupported config format '{}' for {} (expected json, yaml or yml)",
                    other,
                    path.display()
                )))
            }
        };

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Replace config entries with command-line values
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(test_csv) = &overrides.test_csv {
            self.dataset.args.test_csv_file = Some(test_csv.clone());
        }

        if let Some(device) = &overrides.device {
            self.gpus = Some(DeviceSelector::Name(device.clone()));
            self.visible_devices_scoped = true;
        }

        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }

        if let Some(num_workers) = overrides.num_workers {
            self.num_workers = num_workers;
        }
    }

    /// Check the configuration can drive an evaluation
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be greater than zero"));
        }

        if self.dataset.args.test_csv_file.is_none() {
            return Err(Error::config(
                "No test CSV: set dataset.args.test_csv_file or pass --test-csv",
            ));
        }

        if self.arch.args.num_classes != NUM_CATEGORIES {
            return Err(Error::config(format!(
                "arch.args.num_classes is {}, but results are reported over {} categories",
                self.arch.args.num_classes, NUM_CATEGORIES
            )));
        }

        let _: ArchKind = self.arch.kind()?;
        let _: DatasetKind = self.dataset.kind.parse()?;
        Ok(())
    }

    /// Device for inference.
    ///
    /// A command-line selector has already narrowed the visible GPUs, so
    /// numeric values map to `cuda:0`. A config count of zero means CPU and
    /// any positive count uses the first GPU.
    pub fn device(&self) -> Result<DeviceSpec> {
        match &self.gpus {
            None => Ok(DeviceSpec::Cpu),
            Some(DeviceSelector::Name(name)) if self.visible_devices_scoped => {
                DeviceSpec::from_visible_selector(name)
            }
            Some(DeviceSelector::Name(name)) => name.parse(),
            Some(DeviceSelector::Count(0)) => Ok(DeviceSpec::Cpu),
            Some(DeviceSelector::Count(_)) => Ok(DeviceSpec::Cuda(0)),
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new(self.batch_size, self.num_workers)
    }
}
