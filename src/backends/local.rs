//! Offline token counting with tiktoken encodings

use crate::backends::TokenCounter;
use crate::core::error::CountError;
use crate::core::tokenizer::{count_tokens, TokenModel};

/// Counter that never leaves the process
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCounter;

impl TokenCounter for LocalCounter {
    fn count_tokens(&self, model: &str, content: &str) -> Result<u64, CountError> {
        let model: TokenModel = model.parse().map_err(CountError::Tokenizer)?;
        count_tokens(content, model)
            .map(|n| n as u64)
            .map_err(CountError::Tokenizer)
    }
}
