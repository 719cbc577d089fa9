//! Classifier trait and batch inputs

use candle_core::{Device, Tensor};
use toxeval_core::{Batch, Error, Result};

/// Padded batch inputs placed on a compute device
#[derive(Debug, Clone)]
pub struct BatchTensors {
    /// `(batch, seq_len)` u32 token ids
    pub input_ids: Tensor,

    /// `(batch, seq_len)` u32 segment ids
    pub token_type_ids: Tensor,

    /// `(batch, seq_len)` u32, 1 for real tokens and 0 for padding
    pub attention_mask: Tensor,
}

impl BatchTensors {
    /// Pad a batch and move it to `device`
    pub fn from_batch(batch: &Batch, device: &Device) -> Result<Self> {
        let padded = batch.padded();
        let shape = (padded.batch_size, padded.seq_len);

        let tensor = |data: Vec<u32>, what: &str| {
            Tensor::from_vec(data, shape, device)
                .map_err(|e| Error::model(format!("Failed to create {} tensor: {}", what, e)))
        };

        Ok(Self {
            input_ids: tensor(padded.input_ids, "input ids")?,
            token_type_ids: tensor(padded.token_type_ids, "token type")?,
            attention_mask: tensor(padded.attention_mask, "attention mask")?,
        })
    }

    /// Number of rows in the batch
    pub fn batch_size(&self) -> usize {
        self.input_ids.dims().first().copied().unwrap_or(0)
    }
}

/// A model restored to trained parameters, used for inference only.
///
/// `forward` returns raw, unsquashed logits of shape
/// `(batch_size, num_labels)`. Candle only tracks gradients for `Var`s, so
/// no backpropagation graph is built here.
pub trait SequenceClassifier: Send + Sync {
    /// Run the model over one batch
    fn forward(&self, inputs: &BatchTensors) -> Result<Tensor>;

    /// Device inputs must be placed on
    fn device(&self) -> &Device;

    /// Width of the logits
    fn num_labels(&self) -> usize;

    /// Get the classifier name
    fn name(&self) -> &str;
}
