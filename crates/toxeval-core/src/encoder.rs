//! Text encoder trait

use crate::types::Encoding;
use crate::Result;

/// Turns raw text into model input ids.
///
/// Implementations run on input-preparation workers, so they must be
/// shareable across threads. An `Err` marks the item as unusable; the
/// data loader drops it instead of failing the batch.
pub trait Encoder: Send + Sync {
    /// Encode a single text
    fn encode(&self, text: &str) -> Result<Encoding>;

    /// Get the encoder name
    fn name(&self) -> &str;
}
