//! Checkpoint restoration
//!
//! A checkpoint is a named set of parameter tensors. Training wrappers add
//! prefixes to every name (`model.` for Lightning modules, `module.` for
//! data-parallel wrappers); these are stripped on load so names line up
//! with the architecture's own parameter paths.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use toxeval_core::{Error, Result};

/// Name prefixes added by training wrappers
const WRAPPER_PREFIXES: [&str; 2] = ["model.", "module."];

/// Key under which Lightning stores the parameters
const STATE_DICT_KEY: &str = "state_dict";

/// Checkpoint file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointFormat {
    /// SafeTensors format (recommended)
    SafeTensors,
    /// PyTorch / Lightning pickle
    PyTorch,
}

impl CheckpointFormat {
    /// Infer the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("safetensors") => Ok(Self::SafeTensors),
            Some("ckpt") | Some("pt") | Some("pth") | Some("bin") => Ok(Self::PyTorch),
            other => Err(Error::checkpoint(format!(
                "Unsupported checkpoint extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// Strip wrapper prefixes from a parameter name
pub fn normalize_name(name: &str) -> &str {
    let mut name = name;
    while let Some(stripped) = WRAPPER_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
    {
        name = stripped;
    }
    name
}

/// Parameters restored from a checkpoint file
pub struct Checkpoint {
    path: PathBuf,
    format: CheckpointFormat,
    tensors: HashMap<String, Tensor>,
}

impl Checkpoint {
    /// Read every parameter from `path` onto `device`
    pub fn load(path: impl AsRef<Path>, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::checkpoint(format!(
                "Checkpoint file not found: {}",
                path.display()
            )));
        }

        let format = CheckpointFormat::from_path(path)?;
        let raw: Vec<(String, Tensor)> = match format {
            CheckpointFormat::SafeTensors => candle_core::safetensors::load(path, device)
                .map_err(|e| Error::checkpoint(format!("Failed to load SafeTensors: {}", e)))?
                .into_iter()
                .collect(),
            CheckpointFormat::PyTorch => read_pickle(path)?
                .into_iter()
                .map(|(name, tensor)| {
                    tensor
                        .to_device(device)
                        .map(|t| (name, t))
                        .map_err(|e| Error::checkpoint(format!("Failed to move tensor: {}", e)))
                })
                .collect::<Result<_>>()?,
        };

        let checkpoint = Self::from_named_tensors(path, format, raw)?;
        tracing::info!(
            "Restored {} parameters from {}",
            checkpoint.len(),
            path.display()
        );
        Ok(checkpoint)
    }

    fn from_named_tensors(
        path: &Path,
        format: CheckpointFormat,
        raw: Vec<(String, Tensor)>,
    ) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::checkpoint(format!(
                "Checkpoint {} contains no parameters",
                path.display()
            )));
        }

        let mut tensors = HashMap::with_capacity(raw.len());
        for (name, tensor) in raw {
            let normalized = normalize_name(&name).to_string();
            if tensors.insert(normalized.clone(), tensor).is_some() {
                return Err(Error::checkpoint(format!(
                    "Parameter '{}' appears twice after prefix normalization",
                    normalized
                )));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            format,
            tensors,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> CheckpointFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Check whether a (normalized) parameter name is present
    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// Sorted parameter names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Turn the parameters into a builder for name-matched model construction
    pub fn into_var_builder(self, dtype: DType, device: &Device) -> VarBuilder<'static> {
        VarBuilder::from_tensors(self.tensors, dtype, device)
    }
}

/// Read a pickled state dict, preferring the Lightning `state_dict` entry
fn read_pickle(path: &Path) -> Result<Vec<(String, Tensor)>> {
    match candle_core::pickle::read_all_with_key(path, Some(STATE_DICT_KEY)) {
        Ok(tensors) if !tensors.is_empty() => Ok(tensors),
        _ => {
            tracing::debug!("No '{}' entry in {}, reading top level", STATE_DICT_KEY, path.display());
            candle_core::pickle::read_all(path)
                .map_err(|e| Error::checkpoint(format!("Failed to load PyTorch weights: {}", e)))
        }
    }
}
