//! toxeval Classifiers
//!
//! Candle-backed multi-label text classifiers for offline evaluation.
//!
//! A classifier is assembled from three pieces:
//! - a checkpoint, restored by parameter name (`checkpoint`)
//! - backbone hyperparameters and tokenizer files, local or from the hub
//!   (`model_config`)
//! - the architecture itself (`bert`)
//!
//! Inputs are tokenized by `TokenizerEncoder`, padded into `BatchTensors`,
//! and scored through the `SequenceClassifier` trait, which returns raw
//! logits.

pub mod bert;
pub mod checkpoint;
pub mod classifier;
pub mod device;
pub mod model_config;
pub mod tokenizer;

pub use bert::BertMultiLabelClassifier;
pub use checkpoint::{Checkpoint, CheckpointFormat};
pub use classifier::{BatchTensors, SequenceClassifier};
pub use device::{DeviceSpec, CUDA_VISIBLE_DEVICES};
pub use model_config::{ArchArgs, ArchKind, ArchSpec, BackboneFiles};
pub use tokenizer::TokenizerEncoder;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bert::BertMultiLabelClassifier;
    pub use crate::checkpoint::Checkpoint;
    pub use crate::classifier::{BatchTensors, SequenceClassifier};
    pub use crate::device::DeviceSpec;
    pub use crate::tokenizer::TokenizerEncoder;
}
