//! toxeval Data
//!
//! Labeled test sets for evaluation:
//! - `Dataset` trait with CSV-backed and in-memory implementations
//! - A closed registry resolving config names (`JigsawDataBERT`, ...) to variants
//! - `DataLoader`, which prepares records on parallel workers and yields
//!   batches in dataset order, dropping null items at collation

pub mod dataset;
pub mod loader;
pub mod registry;
pub mod schema;

pub use dataset::{CsvDataset, Dataset, InMemoryDataset};
pub use loader::{collate, BatchConfig, DataLoader};
pub use registry::{DatasetArgs, DatasetKind, DatasetSpec};
pub use schema::{LabelColumn, RowSchema};
