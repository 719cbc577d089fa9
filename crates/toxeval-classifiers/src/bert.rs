//! BERT multi-label sequence classifier

use crate::checkpoint::Checkpoint;
use crate::classifier::{BatchTensors, SequenceClassifier};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use std::path::Path;
use toxeval_core::{Error, Result};

/// Prefixes the backbone may be stored under, tried in order
const BACKBONE_PREFIXES: [&str; 2] = ["bert", ""];

/// The subset of `config.json` needed to size the head
#[derive(Debug, Deserialize)]
struct BackboneDims {
    hidden_size: usize,
}

/// BERT encoder, optional pooler, and a linear head producing one logit per label
pub struct BertMultiLabelClassifier {
    name: String,
    model: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
    device: Device,
    num_labels: usize,
}

impl BertMultiLabelClassifier {
    /// Build the classifier from restored parameters and a backbone `config.json`
    pub fn from_checkpoint(
        name: impl Into<String>,
        checkpoint: Checkpoint,
        config_path: &Path,
        num_labels: usize,
        device: &Device,
    ) -> Result<Self> {
        let vb = checkpoint.into_var_builder(DType::F32, device);
        Self::load(name, vb, config_path, num_labels)
    }

    /// Build the classifier from a variable builder
    pub fn load(
        name: impl Into<String>,
        vb: VarBuilder,
        config_path: &Path,
        num_labels: usize,
    ) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", config_path.display(), e))
        })?;
        let bert_config: BertConfig = serde_json::from_str(&config_str).map_err(|e| {
            Error::config(format!("Failed to parse config {}: {}", config_path.display(), e))
        })?;
        let dims: BackboneDims = serde_json::from_str(&config_str).map_err(|e| {
            Error::config(format!("Failed to parse config {}: {}", config_path.display(), e))
        })?;

        let (model, prefix) = load_backbone(&vb, &bert_config)?;

        let pooler_vb = if prefix.is_empty() {
            vb.pp("pooler").pp("dense")
        } else {
            vb.pp(prefix).pp("pooler").pp("dense")
        };
        let pooler = candle_nn::linear(dims.hidden_size, dims.hidden_size, pooler_vb).ok();
        if pooler.is_none() {
            tracing::debug!("No pooler in checkpoint, classifying the [CLS] hidden state directly");
        }

        let classifier = candle_nn::linear(dims.hidden_size, num_labels, vb.pp("classifier"))
            .map_err(|e| {
                Error::checkpoint(format!(
                    "Failed to restore classification head (hidden_size={}, num_labels={}): {}",
                    dims.hidden_size, num_labels, e
                ))
            })?;

        tracing::info!(
            "Loaded BERT classifier with {} labels (hidden_size={})",
            num_labels,
            dims.hidden_size
        );

        Ok(Self {
            name: name.into(),
            model,
            pooler,
            classifier,
            device: vb.device().clone(),
            num_labels,
        })
    }

    pub fn has_pooler(&self) -> bool {
        self.pooler.is_some()
    }
}

fn load_backbone(vb: &VarBuilder, config: &BertConfig) -> Result<(BertModel, &'static str)> {
    let mut errors = Vec::new();

    for prefix in BACKBONE_PREFIXES {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                let effective_prefix = if prefix.is_empty() { "<root>" } else { prefix };
                tracing::info!("Loaded BERT backbone from '{}'", effective_prefix);
                return Ok((model, prefix));
            }
            Err(e) => {
                errors.push(format!(
                    "{}: {}",
                    if prefix.is_empty() { "<root>" } else { prefix },
                    e
                ));
            }
        }
    }

    Err(Error::checkpoint(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

impl SequenceClassifier for BertMultiLabelClassifier {
    fn forward(&self, inputs: &BatchTensors) -> Result<Tensor> {
        let hidden_states = self
            .model
            .forward(
                &inputs.input_ids,
                &inputs.token_type_ids,
                Some(&inputs.attention_mask),
            )
            .map_err(|e| Error::model(format!("Model forward pass failed: {}", e)))?;

        let cls_embedding = hidden_states
            .i((.., 0, ..))
            .and_then(|t| t.contiguous())
            .map_err(|e| Error::model(format!("Failed to get CLS token: {}", e)))?;

        let pooled = match &self.pooler {
            Some(pooler) => pooler
                .forward(&cls_embedding)
                .and_then(|t| t.tanh())
                .map_err(|e| Error::model(format!("Pooler failed: {}", e)))?,
            None => cls_embedding,
        };

        self.classifier
            .forward(&pooled)
            .map_err(|e| Error::model(format!("Classification head failed: {}", e)))
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn name(&self) -> &str {
        &self.name
    }
}
