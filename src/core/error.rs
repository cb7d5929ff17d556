//! Error types for the census run

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single `git check-ignore` query
#[derive(Debug, Error)]
pub enum IgnoreQueryError {
    #[error("failed to run git: {0}")]
    Io(#[from] io::Error),

    #[error("git check-ignore exited with {status}: {stderr}", status = describe_code(.code))]
    Status { code: Option<i32>, stderr: String },

    #[error("git check-ignore timed out after {0:?}")]
    Timeout(Duration),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (killed by signal)".to_string(),
    }
}

/// Failure of a single token count request
#[derive(Debug, Error)]
pub enum CountError {
    #[error("authentication rejected (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {message}")]
    Transport { message: String, transient: bool },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("tokenizer unavailable: {0}")]
    Tokenizer(String),
}

impl CountError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            CountError::RateLimited(_) => true,
            CountError::Api { status, .. } => *status >= 500,
            CountError::Transport { transient, .. } => *transient,
            CountError::Auth { .. } | CountError::Decode(_) | CountError::Tokenizer(_) => false,
        }
    }
}

/// Fatal errors that abort a census run
#[derive(Debug, Error)]
pub enum CensusError {
    #[error("failed to count tokens for {path}")]
    Count {
        path: String,
        #[source]
        source: CountError,
    },

    #[error("failed to set up token counter")]
    Setup(#[source] CountError),

    #[error("failed to write report {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize census summary")]
    Serialize(#[from] serde_json::Error),

    #[error("run cancelled")]
    Cancelled,
}
