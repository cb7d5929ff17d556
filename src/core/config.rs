//! Resolved run configuration
//!
//! Built once from CLI flags and the environment, then passed down
//! explicitly. Nothing reads the environment after this point.

use std::path::PathBuf;
use std::time::Duration;

use crate::backends::gemini::GeminiConfig;
use crate::backends::git::IgnoreFailurePolicy;
use crate::core::ignore_set::MatchMode;

/// Which token counter a run uses
#[derive(Debug, Clone)]
pub enum CounterBackend {
    Gemini(GeminiConfig),
    Local,
}

impl CounterBackend {
    pub fn name(&self) -> &'static str {
        match self {
            CounterBackend::Gemini(_) => "gemini",
            CounterBackend::Local => "local",
        }
    }
}

/// Everything one census run needs
#[derive(Debug, Clone)]
pub struct CensusConfig {
    /// Directory to walk
    pub root: PathBuf,

    /// Directory receiving filenames.txt / tokens.txt
    pub out_dir: PathBuf,

    /// Model identifier passed to the counter
    pub model: String,

    pub backend: CounterBackend,

    /// `git` executable used for ignore queries
    pub git_program: PathBuf,

    /// Time allowed for one `git check-ignore`
    pub git_timeout: Duration,

    pub ignore_failure: IgnoreFailurePolicy,

    pub match_mode: MatchMode,

    /// Also write census.json
    pub json: bool,

    /// Suppress progress lines
    pub quiet: bool,
}
