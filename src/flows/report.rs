//! Report emitter - sorted projections of the census
//!
//! Two flat reports per run, both `path: count` lines joined by '\n':
//! - filenames.txt: ascending by path
//! - tokens.txt: descending by token count, ties by path

use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::CensusError;
use crate::core::model::{FileRecord, Summary};

pub const FILENAMES_REPORT: &str = "filenames.txt";
pub const TOKENS_REPORT: &str = "tokens.txt";
pub const CENSUS_JSON: &str = "census.json";

/// Width of the rule line above the summary
const RULE_WIDTH: usize = 80;

/// Records sorted ascending by path
pub fn by_path(records: &[FileRecord]) -> Vec<FileRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    sorted
}

/// Records sorted descending by token count
pub fn by_count(records: &[FileRecord]) -> Vec<FileRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.tokens.cmp(&a.tokens).then_with(|| a.path.cmp(&b.path)));
    sorted
}

/// Render records as report lines (no trailing newline)
pub fn render(records: &[FileRecord]) -> String {
    records
        .iter()
        .map(FileRecord::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Serialize)]
struct CensusJson<'a> {
    backend: &'a str,
    model: &'a str,
    #[serde(flatten)]
    summary: Summary,
    files: Vec<FileRecord>,
}

/// Paths of the artifacts written by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReports {
    pub filenames: PathBuf,
    pub tokens: PathBuf,
    pub json: Option<PathBuf>,
}

/// Metadata carried into census.json
#[derive(Debug, Clone, Copy)]
pub struct JsonMeta<'a> {
    pub backend: &'a str,
    pub model: &'a str,
}

/// Write both reports (and optionally census.json) into `out_dir`
///
/// Existing files are overwritten. Every report is staged next to its
/// destination first and only then renamed into place; if any step fails,
/// staged files and reports already moved are removed again.
pub fn write_reports(
    out_dir: &Path,
    records: &[FileRecord],
    json: Option<JsonMeta<'_>>,
) -> Result<WrittenReports, CensusError> {
    let sorted_by_path = by_path(records);
    let filenames_text = render(&sorted_by_path);
    let tokens_text = render(&by_count(records));
    let json_text = match json {
        Some(meta) => Some(serde_json::to_string_pretty(&CensusJson {
            backend: meta.backend,
            model: meta.model,
            summary: Summary::from_records(records),
            files: sorted_by_path,
        })?),
        None => None,
    };

    fs::create_dir_all(out_dir).map_err(|source| CensusError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut pending = vec![
        (FILENAMES_REPORT, filenames_text),
        (TOKENS_REPORT, tokens_text),
    ];
    if let Some(text) = json_text {
        pending.push((CENSUS_JSON, text));
    }

    let mut staged = Vec::with_capacity(pending.len());
    for (name, contents) in &pending {
        let staging = out_dir.join(format!(".{name}.tmp"));
        if let Err(source) = fs::write(&staging, contents) {
            discard(&staged);
            let _ = fs::remove_file(&staging);
            return Err(CensusError::Write {
                path: staging,
                source,
            });
        }
        staged.push((staging, out_dir.join(name)));
    }

    let mut placed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (i, (staging, dest)) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(staging, dest) {
            discard(&staged[i..]);
            for done in &placed {
                let _ = fs::remove_file(done);
            }
            return Err(CensusError::Write {
                path: dest.clone(),
                source,
            });
        }
        placed.push(dest.clone());
    }

    Ok(WrittenReports {
        filenames: out_dir.join(FILENAMES_REPORT),
        tokens: out_dir.join(TOKENS_REPORT),
        json: json.map(|_| out_dir.join(CENSUS_JSON)),
    })
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (staging, _) in staged {
        let _ = fs::remove_file(staging);
    }
}

/// Summary block printed after the reports are written
pub fn render_summary(summary: &Summary) -> String {
    format!(
        "{}\nfile count: {}\ntokens: {}",
        "*".repeat(RULE_WIDTH),
        summary.file_count,
        summary.total_tokens
    )
}

pub fn print_summary(summary: &Summary) {
    println!("{}", render_summary(summary).bold());
}
