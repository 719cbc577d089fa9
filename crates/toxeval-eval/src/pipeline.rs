//! Model assembly and end-to-end evaluation runs

use crate::config::EvalConfig;
use crate::evaluator::{evaluate, MetricsResult};
use candle_core::Device;
use std::path::Path;
use std::sync::Arc;
use toxeval_classifiers::{
    ArchKind, BackboneFiles, BertMultiLabelClassifier, Checkpoint, SequenceClassifier,
    TokenizerEncoder,
};
use toxeval_core::{Encoder, Result};
use toxeval_data::DataLoader;

/// Restore the configured architecture from `checkpoint` and build its encoder
pub fn load_model(
    config: &EvalConfig,
    checkpoint: &Path,
    device: &Device,
) -> Result<(BertMultiLabelClassifier, TokenizerEncoder)> {
    let args = &config.arch.args;
    match config.arch.kind()? {
        ArchKind::Bert => {
            let checkpoint = Checkpoint::load(checkpoint, device)?;
            let files = BackboneFiles::resolve(args)?;

            let model = BertMultiLabelClassifier::from_checkpoint(
                config.name.clone(),
                checkpoint,
                &files.config,
                args.num_classes,
                device,
            )?;
            let encoder = TokenizerEncoder::from_files(args.model_type.clone(), &files, args.max_length)?;
            Ok((model, encoder))
        }
    }
}

/// Build the configured dataset and loader, then evaluate `model` over it
pub async fn run_evaluation(
    model: &dyn SequenceClassifier,
    encoder: Arc<dyn Encoder>,
    config: &EvalConfig,
) -> Result<MetricsResult> {
    let dataset = config.dataset.build()?;
    let loader = DataLoader::new(dataset, encoder, config.batch_config())?;
    evaluate(model, &loader).await
}
