//! Row schemas mapping CSV columns onto samples

use toxeval_core::{LABEL_UNAVAILABLE, NUM_CATEGORIES};

/// Where one category's label comes from
#[derive(Debug, Clone, PartialEq)]
pub struct LabelColumn {
    /// CSV header name
    pub column: String,

    /// Binarize fractional labels (`>= threshold` is positive)
    pub binarize_at: Option<f32>,
}

impl LabelColumn {
    /// Label copied verbatim from the column
    pub fn verbatim(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            binarize_at: None,
        }
    }

    /// Label binarized at the given threshold
    pub fn binarized(column: impl Into<String>, threshold: f32) -> Self {
        Self {
            column: column.into(),
            binarize_at: Some(threshold),
        }
    }

    /// Convert a raw cell value into a target.
    ///
    /// Empty cells and the sentinel stay unavailable. Returns `None` when
    /// the cell is not a number.
    pub fn parse(&self, raw: &str) -> Option<f32> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Some(LABEL_UNAVAILABLE);
        }

        let value: f32 = raw.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        if value == LABEL_UNAVAILABLE {
            return Some(LABEL_UNAVAILABLE);
        }

        Some(match self.binarize_at {
            Some(threshold) if value >= threshold => 1.0,
            Some(_) => 0.0,
            None => value,
        })
    }
}

/// Column layout of a dataset file.
///
/// `labels` holds one slot per category; an empty slot means the dataset
/// never labels that category and every target there is the sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSchema {
    pub id_column: String,
    pub text_column: String,
    pub labels: Vec<Option<LabelColumn>>,
    pub normalize_whitespace: bool,
}

impl RowSchema {
    /// Toxic comment classification challenge layout
    pub fn toxic_comment() -> Self {
        Self {
            id_column: "id".to_string(),
            text_column: "comment_text".to_string(),
            labels: toxeval_core::CATEGORIES
                .iter()
                .map(|name| Some(LabelColumn::verbatim(*name)))
                .collect(),
            normalize_whitespace: false,
        }
    }

    /// Unintended bias layout, fractional annotator scores binarized at 0.5
    pub fn unintended_bias() -> Self {
        let columns = [
            "toxicity",
            "severe_toxicity",
            "obscene",
            "threat",
            "insult",
            "identity_attack",
        ];

        Self {
            id_column: "id".to_string(),
            text_column: "comment_text".to_string(),
            labels: columns
                .iter()
                .map(|name| Some(LabelColumn::binarized(*name, 0.5)))
                .collect(),
            normalize_whitespace: true,
        }
    }

    /// Multilingual layout: only `toxic` is labeled
    pub fn multilingual() -> Self {
        let mut labels = vec![None; NUM_CATEGORIES];
        labels[0] = Some(LabelColumn::verbatim("toxic"));

        Self {
            id_column: "id".to_string(),
            text_column: "content".to_string(),
            labels,
            normalize_whitespace: true,
        }
    }

    /// Override the text column
    pub fn with_text_column(mut self, column: impl Into<String>) -> Self {
        self.text_column = column.into();
        self
    }

    /// Prepare text before encoding
    pub fn clean_text(&self, text: &str) -> String {
        if self.normalize_whitespace {
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            text.to_string()
        }
    }
}
