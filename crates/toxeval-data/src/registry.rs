//! Closed registry of dataset variants
//!
//! Config files name a dataset implementation (`"type": "JigsawDataBERT"`).
//! The name is resolved against [`DatasetKind`] instead of being looked up
//! dynamically, so the set of variants is fixed and enumerable.

use crate::dataset::{CsvDataset, Dataset};
use crate::schema::{LabelColumn, RowSchema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use toxeval_core::{Error, Result, NUM_CATEGORIES};

/// Known dataset variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Plain toxic comment challenge data
    Jigsaw,
    /// Toxic comment challenge data prepared for BERT encoding
    JigsawBert,
    /// Unintended bias data with binarized annotator scores
    JigsawBiasBert,
    /// Multilingual data, `toxic` label only
    JigsawMultilingualBert,
}

impl DatasetKind {
    /// Every registered variant
    pub const ALL: [DatasetKind; 4] = [
        Self::Jigsaw,
        Self::JigsawBert,
        Self::JigsawBiasBert,
        Self::JigsawMultilingualBert,
    ];

    /// Name used in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jigsaw => "JigsawData",
            Self::JigsawBert => "JigsawDataBERT",
            Self::JigsawBiasBert => "JigsawDataBiasBERT",
            Self::JigsawMultilingualBert => "JigsawDataMultilingualBERT",
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            Self::Jigsaw => "jigsaw",
            Self::JigsawBert => "jigsaw_bert",
            Self::JigsawBiasBert => "jigsaw_bias_bert",
            Self::JigsawMultilingualBert => "jigsaw_multilingual_bert",
        }
    }

    /// Names accepted in config files
    pub fn known_names() -> Vec<&'static str> {
        Self::ALL.iter().map(DatasetKind::as_str).collect()
    }

    /// Resolve the row schema for this variant
    pub fn schema(&self, args: &DatasetArgs) -> Result<RowSchema> {
        let schema = match self {
            Self::Jigsaw => {
                let mut schema = RowSchema::toxic_comment();
                if let Some(classes) = &args.classes {
                    if classes.is_empty() || classes.len() > NUM_CATEGORIES {
                        return Err(Error::config(format!(
                            "dataset.args.classes must name 1 to {} columns, got {}",
                            NUM_CATEGORIES,
                            classes.len()
                        )));
                    }
                    schema.labels = (0..NUM_CATEGORIES)
                        .map(|i| classes.get(i).map(LabelColumn::verbatim))
                        .collect();
                }
                schema
            }
            Self::JigsawBert => RowSchema {
                normalize_whitespace: true,
                ..RowSchema::toxic_comment()
            },
            Self::JigsawBiasBert => RowSchema::unintended_bias(),
            Self::JigsawMultilingualBert => RowSchema::multilingual(),
        };

        Ok(match &args.text_column {
            Some(column) => schema.with_text_column(column),
            None => schema,
        })
    }

    /// Construct the test-split dataset for this variant
    pub fn build(&self, args: &DatasetArgs) -> Result<Arc<dyn Dataset>> {
        let path = args
            .test_csv_file
            .as_ref()
            .ok_or_else(|| Error::config("dataset.args.test_csv_file is not set"))?;

        let schema = self.schema(args)?;
        let dataset = CsvDataset::from_path(self.as_str(), path, schema)?;
        Ok(Arc::new(dataset))
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name || kind.alias() == name)
            .ok_or_else(|| {
                Error::config(format!(
                    "Unknown dataset type '{}'; known types: {}",
                    name,
                    Self::known_names().join(", ")
                ))
            })
    }
}

/// Constructor arguments for a dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetArgs {
    /// Labeled split to evaluate
    #[serde(default)]
    pub test_csv_file: Option<PathBuf>,

    /// Training split (unused during evaluation, accepted for config compatibility)
    #[serde(default)]
    pub train_csv_file: Option<PathBuf>,

    /// Label column names for the plain variant
    #[serde(default)]
    pub classes: Option<Vec<String>>,

    /// Override the text column
    #[serde(default)]
    pub text_column: Option<String>,
}

/// Dataset section of a run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Registered dataset name
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub args: DatasetArgs,
}

impl DatasetSpec {
    /// Resolve the variant and construct the dataset
    pub fn build(&self) -> Result<Arc<dyn Dataset>> {
        let kind: DatasetKind = self.kind.parse()?;
        tracing::info!("Building dataset '{}'", kind);
        kind.build(&self.args)
    }
}
