//! Census flow - one full run from config to written reports

use tracing::{debug, info};

use crate::backends::gemini::GeminiCounter;
use crate::backends::git::GitIgnoreOracle;
use crate::backends::local::LocalCounter;
use crate::backends::{IgnoreOracle, TokenCounter};
use crate::core::config::{CensusConfig, CounterBackend};
use crate::core::error::CensusError;
use crate::core::model::{FileRecord, Summary};
use crate::core::util::CancelToken;
use crate::flows::report::{self, JsonMeta, WrittenReports};
use crate::flows::walk::TreeWalker;

/// Outcome of a completed run
#[derive(Debug)]
pub struct CensusOutcome {
    pub records: Vec<FileRecord>,
    pub summary: Summary,
    pub reports: WrittenReports,
}

/// Build the configured counter
pub fn build_counter(backend: &CounterBackend) -> Result<Box<dyn TokenCounter>, CensusError> {
    match backend {
        CounterBackend::Gemini(config) => {
            let counter = GeminiCounter::new(config.clone()).map_err(CensusError::Setup)?;
            Ok(Box::new(counter))
        }
        CounterBackend::Local => Ok(Box::new(LocalCounter)),
    }
}

/// Walk, count, and report with explicit collaborators
///
/// Reports are only written once the walk finished without a fatal error.
pub fn run_with(
    config: &CensusConfig,
    oracle: &dyn IgnoreOracle,
    counter: &dyn TokenCounter,
    cancel: CancelToken,
) -> Result<CensusOutcome, CensusError> {
    let mut walker = TreeWalker::new(&config.root, &config.model, oracle, counter)
        .match_mode(config.match_mode)
        .cancel_token(cancel.clone())
        .quiet(config.quiet);
    let records = walker.collect()?;
    cancel.check()?;

    if !walker.ignored().is_empty() {
        debug!(paths = ?walker.ignored().iter().collect::<Vec<_>>(), "ignored");
    }

    let json = config.json.then(|| JsonMeta {
        backend: config.backend.name(),
        model: &config.model,
    });
    let reports = report::write_reports(&config.out_dir, &records, json)?;
    let summary = Summary::from_records(&records);

    info!(
        files = summary.file_count,
        tokens = summary.total_tokens,
        ignored = walker.ignored().len(),
        skipped = walker.skipped(),
        "census complete"
    );

    Ok(CensusOutcome {
        records,
        summary,
        reports,
    })
}

/// Run a census with the collaborators named by `config`
pub fn run(config: &CensusConfig, cancel: CancelToken) -> Result<CensusOutcome, CensusError> {
    let oracle = GitIgnoreOracle::new(config.git_timeout, config.ignore_failure)
        .program(&config.git_program);
    let counter = build_counter(&config.backend)?;
    let outcome = run_with(config, &oracle, counter.as_ref(), cancel)?;
    debug!(
        records = outcome.records.len(),
        filenames = %outcome.reports.filenames.display(),
        tokens = %outcome.reports.tokens.display(),
        json = ?outcome.reports.json,
        "reports written"
    );
    report::print_summary(&outcome.summary);
    Ok(outcome)
}
