//! Checkpoint evaluation over an ordered data loader

use crate::metrics::{nan_mean, per_category_auc};
use candle_core::DType;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use toxeval_classifiers::{BatchTensors, SequenceClassifier};
use toxeval_core::{Batch, Error, Result};
use toxeval_data::DataLoader;

/// Threshold turning a probability into a positive prediction
pub const BINARY_THRESHOLD: f32 = 0.5;

/// Everything produced by one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResult {
    /// Per-item probabilities, `(items, categories)`, in dataset order
    pub scores: Vec<Vec<f32>>,

    /// Per-item targets, sentinel included
    pub targets: Vec<Vec<f32>>,

    /// ROC-AUC per category, `NaN` where undefined
    #[serde(with = "nan_as_null::vec")]
    pub auc_scores: Vec<f64>,

    /// Mean over the defined categories
    #[serde(with = "nan_as_null")]
    pub mean_auc: f64,

    /// Item ids aligned with `scores`
    pub ids: Vec<String>,

    /// `scores >= 0.5`
    #[serde(skip)]
    pub binary_scores: Vec<Vec<bool>>,

    /// Items dropped at collation
    #[serde(skip)]
    pub dropped: usize,
}

impl MetricsResult {
    /// Aggregate buffered predictions into metrics
    pub fn from_predictions(
        ids: Vec<String>,
        scores: Vec<Vec<f32>>,
        targets: Vec<Vec<f32>>,
        num_categories: usize,
        dropped: usize,
    ) -> Self {
        let binary_scores = scores
            .iter()
            .map(|row| row.iter().map(|s| *s >= BINARY_THRESHOLD).collect())
            .collect();
        let auc_scores = per_category_auc(&targets, &scores, num_categories);
        let mean_auc = nan_mean(&auc_scores);

        Self {
            scores,
            targets,
            auc_scores,
            mean_auc,
            ids,
            binary_scores,
            dropped,
        }
    }

    /// Number of scored items
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Score every batch of `loader` with `model` and compute per-category AUC.
///
/// Batches are consumed in dataset order; any inference failure aborts the run.
/// Inference runs inline between polls of the batch stream, so input
/// preparation overlaps it by at most `num_workers` records.
pub async fn evaluate(model: &dyn SequenceClassifier, loader: &DataLoader) -> Result<MetricsResult> {
    let num_labels = model.num_labels();
    let total_batches = loader.num_batches();
    let log_every = (total_batches / 10).max(1);

    tracing::info!(
        "Evaluating '{}' on '{}' ({} items, {} batches)",
        model.name(),
        loader.dataset().name(),
        loader.dataset().len(),
        total_batches
    );

    let capacity = loader.dataset().len();
    let mut ids = Vec::with_capacity(capacity);
    let mut scores = Vec::with_capacity(capacity);
    let mut targets = Vec::with_capacity(capacity);

    let batches = loader.batches();
    futures::pin_mut!(batches);

    let mut seen = 0usize;
    while let Some(batch) = batches.next().await {
        let batch = batch?;
        seen += 1;

        let probs = score_batch(model, &batch)?;
        tracing::debug!(batch = seen, items = batch.len(), "Scored batch");

        ids.extend(batch.ids());
        targets.extend(batch.targets());
        scores.extend(probs);

        if seen % log_every == 0 {
            tracing::info!("Progress: {}/{} batches, {} items", seen, total_batches, scores.len());
        }
    }

    let dropped = loader.dropped();
    if dropped > 0 {
        tracing::warn!("{} items were dropped as null and are excluded from the metrics", dropped);
    }

    let result = MetricsResult::from_predictions(ids, scores, targets, num_labels, dropped);
    tracing::info!(
        "Evaluated {} items, mean AUC {}",
        result.len(),
        result.mean_auc
    );
    Ok(result)
}

/// Probabilities for one batch, shape-checked against the model
fn score_batch(model: &dyn SequenceClassifier, batch: &Batch) -> Result<Vec<Vec<f32>>> {
    let num_labels = model.num_labels();
    if let Some(item) = batch.items().iter().find(|item| item.targets.len() != num_labels) {
        return Err(Error::dataset(format!(
            "Item '{}' has {} targets but the model predicts {} categories",
            item.text_id,
            item.targets.len(),
            num_labels
        )));
    }

    let inputs = BatchTensors::from_batch(batch, model.device())?;
    let logits = model.forward(&inputs)?;

    let dims = logits
        .dims2()
        .map_err(|e| Error::model(format!("Logits must be two-dimensional: {}", e)))?;
    if dims != (batch.len(), num_labels) {
        return Err(Error::model(format!(
            "Expected logits of shape ({}, {}), got {:?}",
            batch.len(),
            num_labels,
            dims
        )));
    }

    candle_nn::ops::sigmoid(&logits)
        .and_then(|probs| probs.to_dtype(DType::F32))
        .and_then(|probs| probs.to_vec2::<f32>())
        .map_err(|e| Error::model(format!("Failed to read probabilities: {}", e)))
}

/// Serialize non-finite floats as `null` and read `null` back as `NaN`
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    fn to_option(value: f64) -> Option<f64> {
        value.is_finite().then_some(value)
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        to_option(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }

    pub mod vec {
        use super::to_option;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|v| to_option(*v)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            let values = Vec::<Option<f64>>::deserialize(deserializer)?;
            Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        }
    }
}
