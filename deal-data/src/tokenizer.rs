//! Token counting and truncation
//!
//! Prompts are budgeted in tokens of the model they are written for. The
//! `HuggingFace` variant loads a real `tokenizer.json`; `Words` counts
//! whitespace-separated words and needs no external files.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DataError, Result};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid word pattern"));

/// Tokenizer used to budget item prompts
pub enum Tokenizer {
    /// Whitespace-delimited words
    Words,
    /// A Hugging Face tokenizer (e.g. Llama 3.1)
    HuggingFace(Box<tokenizers::Tokenizer>),
}

impl Tokenizer {
    /// Load a Hugging Face `tokenizer.json`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let tokenizer = tokenizers::Tokenizer::from_file(path.as_ref())
            .map_err(|e| DataError::Tokenizer(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(Tokenizer::HuggingFace(Box::new(tokenizer)))
    }

    /// Number of tokens in `text` (no special tokens)
    pub fn count(&self, text: &str) -> Result<usize> {
        match self {
            Tokenizer::Words => Ok(WORD.find_iter(text).count()),
            Tokenizer::HuggingFace(tokenizer) => Ok(encode_ids(tokenizer, text)?.len()),
        }
    }

    /// Keep the first `max_tokens` tokens of `text`
    ///
    /// Returns the truncated text and its token count.
    pub fn truncate(&self, text: &str, max_tokens: usize) -> Result<(String, usize)> {
        match self {
            Tokenizer::Words => {
                let mut count = 0;
                let mut end = 0;
                for word in WORD.find_iter(text).take(max_tokens) {
                    count += 1;
                    end = word.end();
                }
                Ok((text[..end].to_string(), count))
            }
            Tokenizer::HuggingFace(tokenizer) => {
                let ids = encode_ids(tokenizer, text)?;
                if ids.len() <= max_tokens {
                    return Ok((text.to_string(), ids.len()));
                }

                // Decoded text can re-encode to more tokens than it came from
                let mut keep = max_tokens;
                loop {
                    let decoded = tokenizer
                        .decode(&ids[..keep], false)
                        .map_err(|e| DataError::Tokenizer(e.to_string()))?;
                    let count = encode_ids(tokenizer, &decoded)?.len();
                    if count <= max_tokens || keep == 0 {
                        return Ok((decoded, count));
                    }
                    keep = keep.saturating_sub((count - max_tokens).max(1));
                }
            }
        }
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tokenizer::Words => write!(f, "Tokenizer::Words"),
            Tokenizer::HuggingFace(_) => write!(f, "Tokenizer::HuggingFace"),
        }
    }
}

fn encode_ids(tokenizer: &tokenizers::Tokenizer, text: &str) -> Result<Vec<u32>> {
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| DataError::Tokenizer(e.to_string()))?;
    Ok(encoding.get_ids().to_vec())
}
