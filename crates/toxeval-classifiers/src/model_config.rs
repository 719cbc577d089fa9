//! Architecture configuration and backbone file resolution

use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use toxeval_core::{Error, Result, NUM_CATEGORIES};

/// Supported model architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchKind {
    /// BERT encoder with a linear multi-label head
    Bert,
}

impl FromStr for ArchKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "bert" | "bert-sequence-classification" => Ok(Self::Bert),
            other => Err(Error::config(format!(
                "Unsupported architecture '{}'; supported: BERT",
                other
            ))),
        }
    }
}

impl fmt::Display for ArchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bert => write!(f, "BERT"),
        }
    }
}

/// Architecture section of a run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchSpec {
    /// Architecture name (e.g. `BERT`)
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub args: ArchArgs,
}

impl ArchSpec {
    pub fn kind(&self) -> Result<ArchKind> {
        self.kind.parse()
    }
}

/// Architecture arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchArgs {
    /// Width of the classification head
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,

    /// Hugging Face repo providing `config.json` and the tokenizer
    #[serde(default = "default_model_type")]
    pub model_type: String,

    /// Repo revision
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Local directory with `config.json` and `tokenizer.json`/`vocab.txt`;
    /// takes precedence over `model_type`
    #[serde(default)]
    pub model_dir: Option<PathBuf>,

    /// Maximum sequence length, special tokens included
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_num_classes() -> usize {
    NUM_CATEGORIES
}

fn default_model_type() -> String {
    "bert-base-uncased".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_max_length() -> usize {
    512
}

impl Default for ArchArgs {
    fn default() -> Self {
        Self {
            num_classes: default_num_classes(),
            model_type: default_model_type(),
            revision: default_revision(),
            model_dir: None,
            max_length: default_max_length(),
        }
    }
}

/// Files describing the backbone (weights come from the checkpoint)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackboneFiles {
    /// Backbone hyperparameters
    pub config: PathBuf,

    /// Serialized tokenizer, if available
    pub tokenizer: Option<PathBuf>,

    /// WordPiece vocabulary, if available
    pub vocab: Option<PathBuf>,
}

impl BackboneFiles {
    /// Locate files in a local directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let config = dir.join("config.json");
        if !config.exists() {
            return Err(Error::config(format!(
                "config.json not found in {}",
                dir.display()
            )));
        }

        let existing = |name: &str| Some(dir.join(name)).filter(|p| p.exists());
        let files = Self {
            config,
            tokenizer: existing("tokenizer.json"),
            vocab: existing("vocab.txt"),
        };

        if files.tokenizer.is_none() && files.vocab.is_none() {
            return Err(Error::config(format!(
                "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
                dir.display()
            )));
        }

        Ok(files)
    }

    /// Download (or reuse cached) files from Hugging Face Hub
    pub fn from_hub(repo_id: &str, revision: &str) -> Result<Self> {
        tracing::info!("Fetching backbone files from HuggingFace: {} @ {}", repo_id, revision);

        let api = Api::new()
            .map_err(|e| Error::config(format!("Failed to initialize HF API: {}", e)))?;
        let repo = api.repo(Repo::with_revision(
            repo_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        let config = repo
            .get("config.json")
            .map_err(|e| Error::config(format!("Failed to download config.json: {}", e)))?;

        let tokenizer = repo.get("tokenizer.json").ok();
        let vocab = if tokenizer.is_none() {
            repo.get("vocab.txt").ok()
        } else {
            None
        };

        if tokenizer.is_none() && vocab.is_none() {
            return Err(Error::config(format!(
                "No tokenizer available in {} (tried tokenizer.json, vocab.txt)",
                repo_id
            )));
        }

        Ok(Self {
            config,
            tokenizer,
            vocab,
        })
    }

    /// Resolve files for an architecture: local directory first, then the hub
    pub fn resolve(args: &ArchArgs) -> Result<Self> {
        match &args.model_dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::from_hub(&args.model_type, &args.revision),
        }
    }
}
