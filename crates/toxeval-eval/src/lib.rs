//! toxeval Eval
//!
//! Offline evaluation of a fine-tuned multi-label toxicity classifier:
//! restore a checkpoint, score a labeled test set in order, compute
//! per-category ROC-AUC, and write a results record plus a submission table
//! next to the checkpoint.

pub mod config;
pub mod evaluator;
pub mod metrics;
pub mod output;
pub mod pipeline;

pub use config::{DeviceSelector, EvalConfig, Overrides};
pub use evaluator::{evaluate, MetricsResult, BINARY_THRESHOLD};
pub use metrics::{masked_column, nan_mean, per_category_auc, roc_auc, MetricError};
pub use output::{output_paths, write_outputs, write_results, write_submission, OutputPaths};
pub use pipeline::{load_model, run_evaluation};
