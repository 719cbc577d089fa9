//! Tokenizer-backed text encoder

use crate::model_config::BackboneFiles;
use tokenizers::{Tokenizer, TruncationParams};
use toxeval_core::{Encoder, Encoding, Error, Result};

/// Encodes text with a Hugging Face tokenizer, truncating to `max_length`
pub struct TokenizerEncoder {
    name: String,
    tokenizer: Tokenizer,
    max_length: usize,
}

impl TokenizerEncoder {
    /// Wrap a tokenizer; truncation is applied after special tokens are added
    pub fn new(name: impl Into<String>, mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        if max_length == 0 {
            return Err(Error::config("max_length must be greater than zero"));
        }

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::config(format!("Failed to configure truncation: {}", e)))?;
        tokenizer.with_padding(None);

        Ok(Self {
            name: name.into(),
            tokenizer,
            max_length,
        })
    }

    /// Load the tokenizer for a backbone
    pub fn from_files(name: impl Into<String>, files: &BackboneFiles, max_length: usize) -> Result<Self> {
        let tokenizer = load_tokenizer(files)?;
        Self::new(name, tokenizer, max_length)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Encoder for TokenizerEncoder {
    fn encode(&self, text: &str) -> Result<Encoding> {
        if text.trim().is_empty() {
            return Err(Error::dataset("empty text"));
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::dataset(format!("Tokenization failed: {}", e)))?;

        Ok(Encoding {
            ids: encoding.get_ids().to_vec(),
            type_ids: encoding.get_type_ids().to_vec(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn load_tokenizer(files: &BackboneFiles) -> Result<Tokenizer> {
    if let Some(path) = &files.tokenizer {
        tracing::debug!("Loading tokenizer from {}", path.display());
        return Tokenizer::from_file(path)
            .map_err(|e| Error::config(format!("Failed to load tokenizer.json: {}", e)));
    }

    if let Some(vocab_path) = &files.vocab {
        tracing::debug!("Building tokenizer from {}", vocab_path.display());

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| Error::config(format!("Failed to build WordPiece model: {}", e)))?;

        let vocab = tokenizers::Model::get_vocab(&wordpiece);
        let special = |token: &str, fallback: u32| vocab.get(token).copied().unwrap_or(fallback);
        let sep = ("[SEP]".to_string(), special("[SEP]", 102));
        let cls = ("[CLS]".to_string(), special("[CLS]", 101));

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

        return Ok(tokenizer);
    }

    Err(Error::config(format!(
        "No tokenizer available for backbone {}",
        files.config.display()
    )))
}
