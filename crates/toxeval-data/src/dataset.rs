//! Dataset trait and CSV-backed implementation

use crate::schema::RowSchema;
use std::io::Read;
use std::path::Path;
use toxeval_core::{Error, Result, Sample, LABEL_UNAVAILABLE};

/// A finite, indexable source of labeled samples
pub trait Dataset: Send + Sync {
    /// Number of records (including ones that turn out to be unusable)
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the record at `index`; `None` for a null item
    fn get(&self, index: usize) -> Option<Sample>;

    /// Get the dataset name
    fn name(&self) -> &str;
}

/// Dataset backed by a CSV file with a header row.
///
/// Records are read into memory once; parsing into samples happens in
/// `get` so it runs on the loader's workers.
pub struct CsvDataset {
    name: String,
    schema: RowSchema,
    records: Vec<csv::StringRecord>,
    id_idx: usize,
    text_idx: usize,
    label_idx: Vec<Option<usize>>,
}

impl CsvDataset {
    /// Load a CSV file according to `schema`
    pub fn from_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        schema: RowSchema,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            Error::dataset(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let dataset = Self::from_reader(name, file, schema)?;
        tracing::info!(
            "Loaded {} records from {} ({})",
            dataset.len(),
            path.display(),
            dataset.name
        );
        Ok(dataset)
    }

    /// Load CSV content from any reader
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R, schema: RowSchema) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column = |wanted: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == wanted)
                .ok_or_else(|| Error::dataset(format!("Missing column '{}' in dataset", wanted)))
        };

        let id_idx = column(&schema.id_column)?;
        let text_idx = column(&schema.text_column)?;
        let label_idx = schema
            .labels
            .iter()
            .map(|label| label.as_ref().map(|l| column(&l.column)).transpose())
            .collect::<Result<Vec<_>>>()?;

        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

        Ok(Self {
            name: name.into(),
            schema,
            records,
            id_idx,
            text_idx,
            label_idx,
        })
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    fn parse_record(&self, index: usize, record: &csv::StringRecord) -> Option<Sample> {
        let text_id = record.get(self.id_idx).map(str::trim).unwrap_or_default();
        if text_id.is_empty() {
            tracing::debug!(index, "Dropping record without id");
            return None;
        }

        let text = self.schema.clean_text(record.get(self.text_idx).unwrap_or_default());
        if text.trim().is_empty() {
            tracing::debug!(index, text_id, "Dropping record without text");
            return None;
        }

        let mut targets = Vec::with_capacity(self.label_idx.len());
        for (slot, idx) in self.schema.labels.iter().zip(&self.label_idx) {
            let target = match (slot, idx) {
                (Some(label), Some(idx)) => {
                    let raw = record.get(*idx).unwrap_or_default();
                    match label.parse(raw) {
                        Some(value) => value,
                        None => {
                            tracing::debug!(index, text_id, raw, "Dropping record with malformed label");
                            return None;
                        }
                    }
                }
                _ => LABEL_UNAVAILABLE,
            };
            targets.push(target);
        }

        Some(Sample::new(text_id, text, targets))
    }
}

impl Dataset for CsvDataset {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> Option<Sample> {
        let record = self.records.get(index)?;
        self.parse_record(index, record)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Dataset over samples already held in memory; `None` entries are null items
pub struct InMemoryDataset {
    name: String,
    samples: Vec<Option<Sample>>,
}

impl InMemoryDataset {
    pub fn new(name: impl Into<String>, samples: Vec<Option<Sample>>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    /// Build from samples with no null items
    pub fn from_samples(name: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self::new(name, samples.into_iter().map(Some).collect())
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).cloned().flatten()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
