//! Core types for toxeval

use serde::{Deserialize, Serialize};

/// Target value meaning "ground truth unavailable for this item and category"
pub const LABEL_UNAVAILABLE: f32 = -1.0;

/// Classification categories, in submission column order
pub const CATEGORIES: [&str; 6] = [
    "toxic",
    "severe_toxic",
    "obscene",
    "threat",
    "insult",
    "identity_hate",
];

/// Number of classification categories
pub const NUM_CATEGORIES: usize = CATEGORIES.len();

/// Check whether a target value carries a usable label
pub fn is_label_available(target: f32) -> bool {
    target != LABEL_UNAVAILABLE
}

/// A single labeled record read from a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unique identifier of the record
    pub text_id: String,

    /// Raw text to classify
    pub text: String,

    /// Multi-label targets, one per category
    pub targets: Vec<f32>,
}

impl Sample {
    /// Create a new sample
    pub fn new(text_id: impl Into<String>, text: impl Into<String>, targets: Vec<f32>) -> Self {
        Self {
            text_id: text_id.into(),
            text: text.into(),
            targets,
        }
    }
}

/// Token-level encoding of a sample's text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Encoding {
    /// Vocabulary ids
    pub ids: Vec<u32>,

    /// Segment ids, same length as `ids`
    pub type_ids: Vec<u32>,
}

impl Encoding {
    /// Build an encoding with all-zero segment ids
    pub fn from_ids(ids: Vec<u32>) -> Self {
        let type_ids = vec![0; ids.len()];
        Self { ids, type_ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A sample whose text has been encoded for the model
#[derive(Debug, Clone)]
pub struct EncodedSample {
    pub text_id: String,
    pub encoding: Encoding,
    pub targets: Vec<f32>,
}

/// Padded, row-major token matrices for one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedInputs {
    pub input_ids: Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub batch_size: usize,
    pub seq_len: usize,
}

/// An ordered group of encoded samples processed together
#[derive(Debug, Clone, Default)]
pub struct Batch {
    items: Vec<EncodedSample>,
}

impl Batch {
    /// Id used for padding positions
    pub const PAD_ID: u32 = 0;

    pub fn new(items: Vec<EncodedSample>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[EncodedSample] {
        &self.items
    }

    /// Identifiers in batch order
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.text_id.clone()).collect()
    }

    /// Target vectors in batch order
    pub fn targets(&self) -> Vec<Vec<f32>> {
        self.items.iter().map(|item| item.targets.clone()).collect()
    }

    /// Longest encoding in the batch
    pub fn max_seq_len(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.encoding.len())
            .max()
            .unwrap_or(0)
    }

    /// Right-pad every encoding to the longest one and build the attention mask
    pub fn padded(&self) -> PaddedInputs {
        let seq_len = self.max_seq_len();
        let total = self.items.len() * seq_len;

        let mut input_ids = Vec::with_capacity(total);
        let mut token_type_ids = Vec::with_capacity(total);
        let mut attention_mask = Vec::with_capacity(total);

        for item in &self.items {
            let enc = &item.encoding;
            let pad = seq_len - enc.len();

            input_ids.extend_from_slice(&enc.ids);
            input_ids.extend(std::iter::repeat(Self::PAD_ID).take(pad));

            token_type_ids.extend_from_slice(&enc.type_ids);
            token_type_ids.extend(std::iter::repeat(0).take(pad));

            attention_mask.extend(std::iter::repeat(1).take(enc.len()));
            attention_mask.extend(std::iter::repeat(0).take(pad));
        }

        PaddedInputs {
            input_ids,
            token_type_ids,
            attention_mask,
            batch_size: self.items.len(),
            seq_len,
        }
    }
}
