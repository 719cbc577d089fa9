//! Ordered batch loading with parallel input preparation
//!
//! Each dataset record is read and encoded on a blocking worker. Up to
//! `num_workers` records are prepared at once, but results are yielded in
//! dataset order, so batching never changes which item lands where.

use crate::dataset::Dataset;
use futures::stream::{self, Stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use toxeval_core::{Batch, EncodedSample, Encoder, Error, Result};

/// Batching and input-preparation knobs; no effect on results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Records per batch (before null items are dropped)
    pub batch_size: usize,

    /// Records prepared concurrently
    pub num_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            num_workers: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    pub fn new(batch_size: usize, num_workers: usize) -> Self {
        Self {
            batch_size,
            num_workers,
        }
    }
}

/// Drop null items from a group of prepared records.
///
/// Returns the batch and the number of items dropped.
pub fn collate(items: Vec<Option<EncodedSample>>) -> (Batch, usize) {
    let total = items.len();
    let kept: Vec<EncodedSample> = items.into_iter().flatten().collect();
    let dropped = total - kept.len();
    (Batch::new(kept), dropped)
}

/// Read and encode one record; `None` when it is unusable
fn prepare(dataset: &dyn Dataset, encoder: &dyn Encoder, index: usize) -> Option<EncodedSample> {
    let sample = dataset.get(index)?;

    match encoder.encode(&sample.text) {
        Ok(encoding) if !encoding.is_empty() => Some(EncodedSample {
            text_id: sample.text_id,
            encoding,
            targets: sample.targets,
        }),
        Ok(_) => {
            tracing::debug!(index, text_id = %sample.text_id, "Dropping item with empty encoding");
            None
        }
        Err(e) => {
            tracing::debug!(index, text_id = %sample.text_id, "Dropping item that failed to encode: {}", e);
            None
        }
    }
}

/// Iterates a dataset in fixed order, grouped into batches.
///
/// Preparation only advances while the stream is polled: a consumer that
/// runs inference synchronously between polls overlaps it with at most
/// `num_workers` records already in flight.
pub struct DataLoader {
    dataset: Arc<dyn Dataset>,
    encoder: Arc<dyn Encoder>,
    config: BatchConfig,
    dropped: Arc<AtomicUsize>,
}

impl DataLoader {
    /// Create a new loader
    pub fn new(
        dataset: Arc<dyn Dataset>,
        encoder: Arc<dyn Encoder>,
        config: BatchConfig,
    ) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::config("batch_size must be greater than zero"));
        }

        Ok(Self {
            dataset,
            encoder,
            config,
            dropped: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn dataset(&self) -> &Arc<dyn Dataset> {
        &self.dataset
    }

    pub fn config(&self) -> BatchConfig {
        self.config
    }

    /// Number of batches before empty ones are skipped
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.config.batch_size)
    }

    /// Items dropped by collation in the most recent `batches()` stream
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stream of batches in dataset order.
    ///
    /// Batches whose every item was dropped are skipped. A panicked worker
    /// surfaces as an error item. Starting a stream resets `dropped()`.
    pub fn batches(&self) -> impl Stream<Item = Result<Batch>> + Send + 'static {
        self.dropped.store(0, Ordering::Relaxed);
        let dataset = Arc::clone(&self.dataset);
        let encoder = Arc::clone(&self.encoder);
        let dropped = Arc::clone(&self.dropped);
        let workers = self.config.num_workers.max(1);

        stream::iter(0..dataset.len())
            .map(move |index| {
                let dataset = Arc::clone(&dataset);
                let encoder = Arc::clone(&encoder);
                tokio::task::spawn_blocking(move || {
                    prepare(dataset.as_ref(), encoder.as_ref(), index)
                })
            })
            .buffered(workers)
            .chunks(self.config.batch_size)
            .filter_map(move |prepared| {
                let dropped = Arc::clone(&dropped);
                async move {
                    let items = match prepared.into_iter().collect::<std::result::Result<Vec<_>, _>>() {
                        Ok(items) => items,
                        Err(e) => {
                            return Some(Err(Error::dataset(format!(
                                "Input preparation worker failed: {}",
                                e
                            ))))
                        }
                    };

                    let (batch, n_dropped) = collate(items);
                    if n_dropped > 0 {
                        dropped.fetch_add(n_dropped, Ordering::Relaxed);
                    }

                    if batch.is_empty() {
                        None
                    } else {
                        Some(Ok(batch))
                    }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use toxeval_core::{Encoding, Sample};

    struct ByteEncoder;

    impl Encoder for ByteEncoder {
        fn encode(&self, text: &str) -> Result<Encoding> {
            if text.contains("FAIL") {
                return Err(Error::model("unencodable"));
            }
            Ok(Encoding::from_ids(text.bytes().map(u32::from).collect()))
        }

        fn name(&self) -> &str {
            "bytes"
        }
    }

    fn dataset(items: Vec<Option<&str>>) -> Arc<dyn Dataset> {
        let samples = items
            .into_iter()
            .enumerate()
            .map(|(i, text)| text.map(|t| Sample::new(format!("id{}", i), t, vec![0.0])))
            .collect();
        Arc::new(InMemoryDataset::new("test", samples))
    }

    async fn collect_ids(loader: &DataLoader) -> Vec<Vec<String>> {
        loader
            .batches()
            .map(|batch| batch.unwrap().ids())
            .collect::<Vec<_>>()
            .await
    }

    #[test]
    fn test_collate_drops_nulls() {
        let item = EncodedSample {
            text_id: "x".to_string(),
            encoding: Encoding::from_ids(vec![1]),
            targets: vec![1.0],
        };
        let (batch, dropped) = collate(vec![None, Some(item), None]);
        assert_eq!(batch.len(), 1);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = DataLoader::new(dataset(vec![Some("a")]), Arc::new(ByteEncoder), BatchConfig::new(0, 1));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_batches_preserve_order() {
        let texts: Vec<Option<&str>> = vec![Some("a"), Some("b"), Some("c"), Some("d"), Some("e")];
        let loader = DataLoader::new(dataset(texts), Arc::new(ByteEncoder), BatchConfig::new(2, 4)).unwrap();

        assert_eq!(loader.num_batches(), 3);
        let batches = collect_ids(&loader).await;
        assert_eq!(
            batches,
            vec![
                vec!["id0".to_string(), "id1".to_string()],
                vec!["id2".to_string(), "id3".to_string()],
                vec!["id4".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_null_and_unencodable_items_dropped() {
        let texts = vec![Some("a"), None, Some("FAIL"), Some("d")];
        let loader = DataLoader::new(dataset(texts), Arc::new(ByteEncoder), BatchConfig::new(2, 2)).unwrap();

        let batches = collect_ids(&loader).await;
        assert_eq!(batches, vec![vec!["id0".to_string()], vec!["id3".to_string()]]);
        assert_eq!(loader.dropped(), 2);
    }

    #[tokio::test]
    async fn test_fully_dropped_batch_skipped() {
        let texts = vec![None, None, Some("c")];
        let loader = DataLoader::new(dataset(texts), Arc::new(ByteEncoder), BatchConfig::new(2, 1)).unwrap();

        let batches = collect_ids(&loader).await;
        assert_eq!(batches, vec![vec!["id2".to_string()]]);
        assert_eq!(loader.dropped(), 2);
    }

    #[tokio::test]
    async fn test_second_pass_counts_drops_once() {
        let texts = vec![Some("a"), None, Some("FAIL")];
        let loader = DataLoader::new(dataset(texts), Arc::new(ByteEncoder), BatchConfig::new(3, 2)).unwrap();

        collect_ids(&loader).await;
        assert_eq!(loader.dropped(), 2);

        let batches = collect_ids(&loader).await;
        assert_eq!(batches, vec![vec!["id0".to_string()]]);
        assert_eq!(loader.dropped(), 2);
    }
}
