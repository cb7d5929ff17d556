//! Census data model
//!
//! A run produces one [`FileRecord`] per included file. Reports and the
//! summary are derived from the full record sequence after the walk ends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token count for a single file that passed the ignore checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to root, using '/' as separator
    pub path: String,

    /// Total tokens reported by the counter
    pub tokens: u64,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, tokens: u64) -> Self {
        Self {
            path: path.into(),
            tokens,
        }
    }
}

/// Report line format: `path: count`
impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.tokens)
    }
}

/// Totals printed at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of files with a record
    pub file_count: usize,

    /// Sum of all recorded token counts
    pub total_tokens: u64,
}

impl Summary {
    pub fn from_records(records: &[FileRecord]) -> Self {
        Self {
            file_count: records.len(),
            total_tokens: records.iter().map(|r| r.tokens).sum(),
        }
    }
}
