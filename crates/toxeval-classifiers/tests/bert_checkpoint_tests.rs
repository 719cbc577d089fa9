//! BERT checkpoint restoration tests
//!
//! A tiny randomly initialized BERT is written to disk under Lightning-style
//! parameter names and restored through the public loading path.

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use toxeval_classifiers::{BatchTensors, BertMultiLabelClassifier, Checkpoint, SequenceClassifier};
use toxeval_core::{Batch, EncodedSample, Encoding, Error};

const HIDDEN: usize = 8;
const LABELS: usize = 6;

const TINY_BERT_CONFIG: &str = r#"{
    "vocab_size": 32,
    "hidden_size": 8,
    "num_hidden_layers": 1,
    "num_attention_heads": 2,
    "intermediate_size": 16,
    "hidden_act": "gelu",
    "hidden_dropout_prob": 0.0,
    "max_position_embeddings": 16,
    "type_vocab_size": 2,
    "initializer_range": 0.02,
    "layer_norm_eps": 1e-12,
    "pad_token_id": 0,
    "position_embedding_type": "absolute",
    "use_cache": false,
    "classifier_dropout": null,
    "model_type": "bert"
}"#;

struct Fixture {
    _dir: TempDir,
    config: PathBuf,
    checkpoint: PathBuf,
}

/// Write a config and a checkpoint; `with_head` controls whether the
/// classification head is included
fn write_tiny_bert(with_head: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, TINY_BERT_CONFIG).unwrap();

    let bert_config: BertConfig = serde_json::from_str(TINY_BERT_CONFIG).unwrap();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    BertModel::load(vb.pp("bert"), &bert_config).unwrap();
    candle_nn::linear(HIDDEN, HIDDEN, vb.pp("bert").pp("pooler").pp("dense")).unwrap();
    if with_head {
        candle_nn::linear(HIDDEN, LABELS, vb.pp("classifier")).unwrap();
    }

    let tensors: HashMap<String, Tensor> = varmap
        .data()
        .lock()
        .unwrap()
        .iter()
        .map(|(name, var)| (format!("model.{}", name), var.as_tensor().clone()))
        .collect();

    let checkpoint_path = dir.path().join("epoch=1.safetensors");
    candle_core::safetensors::save(&tensors, &checkpoint_path).unwrap();

    Fixture {
        _dir: dir,
        config: config_path,
        checkpoint: checkpoint_path,
    }
}

fn load_classifier(checkpoint: &Path, config: &Path) -> toxeval_core::Result<BertMultiLabelClassifier> {
    let checkpoint = Checkpoint::load(checkpoint, &Device::Cpu)?;
    BertMultiLabelClassifier::from_checkpoint("tiny-bert", checkpoint, config, LABELS, &Device::Cpu)
}

fn item(id: &str, ids: Vec<u32>) -> EncodedSample {
    EncodedSample {
        text_id: id.to_string(),
        encoding: Encoding::from_ids(ids),
        targets: vec![0.0; LABELS],
    }
}

fn logits(model: &BertMultiLabelClassifier, items: Vec<EncodedSample>) -> Vec<Vec<f32>> {
    let inputs = BatchTensors::from_batch(&Batch::new(items), model.device()).unwrap();
    model.forward(&inputs).unwrap().to_vec2::<f32>().unwrap()
}

#[test]
fn test_restores_prefixed_checkpoint() {
    let fixture = write_tiny_bert(true);
    let model = load_classifier(&fixture.checkpoint, &fixture.config).unwrap();

    assert_eq!(model.num_labels(), LABELS);
    assert_eq!(model.name(), "tiny-bert");
    assert!(model.has_pooler());
}

#[test]
fn test_forward_shape_and_finite() {
    let fixture = write_tiny_bert(true);
    let model = load_classifier(&fixture.checkpoint, &fixture.config).unwrap();

    let out = logits(&model, vec![item("a", vec![2, 7, 9, 3]), item("b", vec![2, 5, 3])]);
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|row| row.len() == LABELS));
    assert!(out.iter().flatten().all(|v| v.is_finite()));
}

#[test]
fn test_padding_does_not_change_logits() {
    let fixture = write_tiny_bert(true);
    let model = load_classifier(&fixture.checkpoint, &fixture.config).unwrap();

    let together = logits(&model, vec![item("a", vec![2, 7, 9, 11, 3]), item("b", vec![2, 5, 3])]);
    let alone = logits(&model, vec![item("b", vec![2, 5, 3])]);

    for (x, y) in together[1].iter().zip(&alone[0]) {
        assert!((x - y).abs() < 1e-4, "padded {} vs unpadded {}", x, y);
    }
}

#[test]
fn test_missing_head_is_checkpoint_error() {
    let fixture = write_tiny_bert(false);
    let result = load_classifier(&fixture.checkpoint, &fixture.config);
    assert!(matches!(result, Err(Error::Checkpoint(_))));
}

#[test]
fn test_head_width_mismatch_is_checkpoint_error() {
    let fixture = write_tiny_bert(true);
    let checkpoint = Checkpoint::load(&fixture.checkpoint, &Device::Cpu).unwrap();
    let result =
        BertMultiLabelClassifier::from_checkpoint("tiny-bert", checkpoint, &fixture.config, 3, &Device::Cpu);
    assert!(matches!(result, Err(Error::Checkpoint(_))));
}
