//! Dataset registry integration tests
//!
//! Build datasets from config sections pointing at CSV files on disk and
//! stream them through the loader.

use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use toxeval_core::{Encoder, Encoding, Result, LABEL_UNAVAILABLE};
use toxeval_data::{BatchConfig, DataLoader, DatasetSpec};

struct WordEncoder;

impl Encoder for WordEncoder {
    fn encode(&self, text: &str) -> Result<Encoding> {
        Ok(Encoding::from_ids(
            text.split_whitespace().map(|w| w.len() as u32).collect(),
        ))
    }

    fn name(&self) -> &str {
        "words"
    }
}

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_bias_dataset_from_json_config() {
    let csv = write_csv(
        "id,comment_text,toxicity,severe_toxicity,obscene,threat,insult,identity_attack\n\
         10,fine words,0.1,0.0,0.0,0.0,0.0,0.0\n\
         11,awful   words,0.8,0.2,0.6,0.0,0.7,-1\n",
    );

    let json = format!(
        r#"{{"type": "JigsawDataBiasBERT", "args": {{"test_csv_file": "{}", "train_csv_file": "unused.csv"}}}}"#,
        csv.path().display()
    );
    let spec: DatasetSpec = serde_json::from_str(&json).unwrap();
    let dataset = spec.build().unwrap();
    assert_eq!(dataset.len(), 2);

    let sample = dataset.get(1).unwrap();
    assert_eq!(sample.text, "awful words");
    assert_eq!(sample.targets, vec![1.0, 0.0, 1.0, 0.0, 1.0, LABEL_UNAVAILABLE]);
}

#[tokio::test]
async fn test_multilingual_dataset_from_yaml_config() {
    let csv = write_csv("id,content,lang,toxic\n1,ciao,it,0\n2,,it,1\n3,merde alors,fr,1\n");

    let yaml = format!(
        "type: jigsaw_multilingual_bert\nargs:\n  test_csv_file: {}\n",
        csv.path().display()
    );
    let spec: DatasetSpec = serde_yaml::from_str(&yaml).unwrap();
    let dataset = spec.build().unwrap();

    let loader = DataLoader::new(dataset, Arc::new(WordEncoder), BatchConfig::new(8, 3)).unwrap();
    let batches: Vec<_> = loader.batches().collect().await;

    assert_eq!(batches.len(), 1);
    let batch = batches.into_iter().next().unwrap().unwrap();
    assert_eq!(batch.ids(), vec!["1".to_string(), "3".to_string()]);
    assert_eq!(loader.dropped(), 1);
}

#[tokio::test]
async fn test_unknown_dataset_type() {
    let spec: DatasetSpec =
        serde_json::from_str(r#"{"type": "SomethingElse", "args": {"test_csv_file": "x.csv"}}"#)
            .unwrap();
    let err = spec.build().err().unwrap();
    assert!(err.to_string().contains("known types"));
}

#[tokio::test]
async fn test_missing_file_is_dataset_error() {
    let spec: DatasetSpec = serde_json::from_str(
        r#"{"type": "JigsawDataBERT", "args": {"test_csv_file": "/nonexistent/test.csv"}}"#,
    )
    .unwrap();
    let err = spec.build().err().unwrap();
    assert!(matches!(err, toxeval_core::Error::Dataset(_)));
}
