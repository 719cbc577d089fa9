//! toxeval Core
//!
//! Core types, traits, and utilities shared across toxeval components.
//!
//! This crate provides:
//! - The category list and the "label unavailable" sentinel
//! - Samples, encodings, and padded batches
//! - The `Encoder` trait used by input-preparation workers
//! - Error types and result handling

pub mod encoder;
pub mod error;
pub mod types;

pub use encoder::Encoder;
pub use error::{Error, Result};
pub use types::{
    is_label_available, Batch, EncodedSample, Encoding, PaddedInputs, Sample, CATEGORIES,
    LABEL_UNAVAILABLE, NUM_CATEGORIES,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::encoder::Encoder;
    pub use crate::error::{Error, Result};
    pub use crate::types::{Batch, Encoding, Sample, CATEGORIES, LABEL_UNAVAILABLE};
}
