//! Backends module - external collaborators of the census
//!
//! Provides:
//! - git: ignore oracle backed by `git check-ignore`
//! - gemini: token counting via the Gemini `countTokens` endpoint
//! - local: offline token counting with tiktoken
//! - retry: bounded retry with backoff for transient count failures

use std::path::Path;

use crate::core::error::CountError;

pub mod gemini;
pub mod git;
pub mod local;
pub mod retry;

/// Decides whether version control ignores a path
pub trait IgnoreOracle {
    /// `target` is relative to `root`, '/'-separated
    fn is_ignored(&self, root: &Path, target: &str) -> bool;
}

/// Counts model tokens in a piece of text
pub trait TokenCounter {
    fn count_tokens(&self, model: &str, content: &str) -> Result<u64, CountError>;
}
