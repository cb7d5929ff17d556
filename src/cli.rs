//! CLI module - Command-line interface definition and handler

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backends::gemini::{GeminiConfig, API_KEY_ENV, DEFAULT_MODEL};
use crate::backends::git::{is_git_available, IgnoreFailurePolicy};
use crate::backends::retry::RetryPolicy;
use crate::core::config::{CensusConfig, CounterBackend};
use crate::core::ignore_set::MatchMode;
use crate::core::tokenizer::{check_encoding, TokenModel};
use crate::core::util::CancelToken;

/// tokcensus - count LLM tokens per file across a repository.
#[derive(Parser, Debug)]
#[command(name = "tokcensus")]
#[command(
    author,
    version,
    about,
    long_about = r#"tokcensus walks a directory tree, skips everything git ignores, counts
tokens in every remaining text file, and writes two reports:

- filenames.txt: "path: count" lines sorted by path
- tokens.txt:    the same lines sorted by token count, largest first

Progress is printed while walking; a summary with the file count and the
total token count is printed at the end. Reports are only written when the
whole run succeeds.

Examples:
    GEMINI_API_KEY=... tokcensus
    tokcensus --root ../other-repo --out-dir /tmp/census
    tokcensus --backend local --model o200k
"#
)]
pub struct Cli {
    /// Directory to walk.
    #[arg(
        long,
        default_value = ".",
        value_name = "ROOT",
        long_help = "Directory to walk (defaults to the current directory).\n\n\
Paths in reports are relative to this root. Ignore rules are evaluated by\n\
running `git -C ROOT check-ignore`."
    )]
    pub root: PathBuf,

    /// Directory receiving filenames.txt and tokens.txt.
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Token counting backend.
    #[arg(
        long,
        default_value = "gemini",
        value_parser = ["gemini", "local"],
        value_name = "BACKEND",
        long_help = "Token counting backend.\n\n\
- gemini (default): the Gemini countTokens endpoint; needs GEMINI_API_KEY\n\
- local: offline tiktoken encodings (cl100k, o200k) or a heuristic estimate"
    )]
    pub backend: String,

    /// Model identifier passed to the backend.
    #[arg(
        long,
        value_name = "MODEL",
        long_help = "Model identifier passed to the backend.\n\n\
Defaults to gemini-2.5-flash for the gemini backend and cl100k for the\n\
local backend. Local models: cl100k, o200k, heuristic."
    )]
    pub model: Option<String>,

    /// API key for the gemini backend.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Base URL of the counting service.
    #[arg(long, value_name = "URL", hide = true)]
    pub api_base: Option<String>,

    /// Seconds allowed for one token count request.
    #[arg(long, default_value_t = 60, value_name = "SECS")]
    pub request_timeout: u64,

    /// git executable used for ignore queries.
    #[arg(long, default_value = "git", value_name = "PATH", hide = true)]
    pub git_program: PathBuf,

    /// Seconds allowed for one `git check-ignore` call.
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    pub git_timeout: u64,

    /// Retries for transient count failures.
    #[arg(
        long,
        default_value_t = 0,
        value_name = "N",
        long_help = "Retry a token count up to N extra times when the failure looks\n\
transient (HTTP 429, 5xx, timeouts, connection errors). Authentication and\n\
other client errors are never retried. Default 0: any failure aborts the run."
    )]
    pub retries: u32,

    /// Initial retry delay in milliseconds (doubles per attempt).
    #[arg(long, default_value_t = 500, value_name = "MS")]
    pub retry_backoff_ms: u64,

    /// Treat failed ignore queries as "ignored".
    #[arg(
        long,
        long_help = "Treat a failed `git check-ignore` (git missing, not a repository,\n\
timeout) as \"ignored\" instead of \"not ignored\".\n\n\
By default failures are logged and the path is counted."
    )]
    pub fail_closed: bool,

    /// Match ignored directories by substring instead of path ancestry.
    #[arg(
        long,
        long_help = "Consider a path inside an ignored directory when the ignored path occurs\n\
anywhere in its string, instead of requiring a whole-segment ancestor.\n\n\
This over-matches (an ignored `foo/bar` also hides `foo/barred`) and exists\n\
for output compatibility with older reports."
    )]
    pub legacy_substring_match: bool,

    /// Also write census.json.
    #[arg(long)]
    pub json: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode (no progress lines).
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (debug logging on stderr).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve flags and environment into a run configuration
    ///
    /// Fails before any traversal when the gemini backend has no API key.
    pub fn to_config(&self) -> Result<CensusConfig> {
        // Get absolute root path
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("Root directory not found: {}", self.root.display()))?;
        if !root.is_dir() {
            bail!("Root is not a directory: {}", root.display());
        }

        let (backend, model) = match self.backend.as_str() {
            "local" => {
                let model = self.model.clone().unwrap_or_else(|| TokenModel::default().to_string());
                let parsed: TokenModel = model.parse().map_err(anyhow::Error::msg)?;
                check_encoding(parsed).map_err(anyhow::Error::msg)?;
                (CounterBackend::Local, model)
            }
            _ => {
                let api_key = match self.api_key.as_deref().map(str::trim) {
                    Some(key) if !key.is_empty() => key.to_string(),
                    _ => bail!(
                        "Missing API key: set {} or pass --api-key (or use --backend local)",
                        API_KEY_ENV
                    ),
                };
                let retry = RetryPolicy::new(
                    self.retries,
                    Duration::from_millis(self.retry_backoff_ms),
                );
                let mut gemini = GeminiConfig::new(api_key)
                    .timeout(Duration::from_secs(self.request_timeout))
                    .retry(retry);
                if let Some(base) = &self.api_base {
                    gemini = gemini.base_url(base.clone());
                }
                let model = self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
                (CounterBackend::Gemini(gemini), model)
            }
        };

        Ok(CensusConfig {
            root,
            out_dir: self.out_dir.clone(),
            model,
            backend,
            git_program: self.git_program.clone(),
            git_timeout: Duration::from_secs(self.git_timeout),
            ignore_failure: if self.fail_closed {
                IgnoreFailurePolicy::FailClosed
            } else {
                IgnoreFailurePolicy::FailOpen
            },
            match_mode: if self.legacy_substring_match {
                MatchMode::Substring
            } else {
                MatchMode::Ancestor
            },
            json: self.json,
            quiet: self.quiet,
        })
    }
}

/// Run the census described by the command line
pub fn run(cli: Cli, cancel: CancelToken) -> Result<()> {
    let config = cli.to_config()?;

    if config.git_program == Path::new("git") && !is_git_available() {
        tracing::warn!(
            fail_closed = cli.fail_closed,
            "git not found in PATH; every ignore query will fail"
        );
    }

    crate::flows::census::run(&config, cancel).context("Census failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["tokcensus"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["--api-key", "k"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.out_dir, PathBuf::from("."));
        assert_eq!(cli.backend, "gemini");
        assert_eq!(cli.retries, 0);
        assert_eq!(cli.git_program, PathBuf::from("git"));
        assert!(!cli.fail_closed);
    }

    #[test]
    fn test_gemini_config() {
        let temp = tempdir().unwrap();
        let root = temp.path().to_str().unwrap();
        let cli = parse(&["--root", root, "--api-key", "secret", "--retries", "2"]);

        let config = cli.to_config().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.ignore_failure, IgnoreFailurePolicy::FailOpen);
        assert_eq!(config.match_mode, MatchMode::Ancestor);
        match config.backend {
            CounterBackend::Gemini(gemini) => {
                assert_eq!(gemini.api_key, "secret");
                assert_eq!(gemini.retry.max_retries, 2);
            }
            other => panic!("unexpected backend: {other:?}"),
        }
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let temp = tempdir().unwrap();
        let root = temp.path().to_str().unwrap();
        let cli = parse(&["--root", root, "--api-key", "  "]);

        let err = cli.to_config().unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn test_local_backend_needs_no_key() {
        let temp = tempdir().unwrap();
        let root = temp.path().to_str().unwrap();
        let cli = parse(&[
            "--root",
            root,
            "--backend",
            "local",
            "--model",
            "heuristic",
            "--fail-closed",
            "--legacy-substring-match",
        ]);

        let config = cli.to_config().unwrap();
        assert!(matches!(config.backend, CounterBackend::Local));
        assert_eq!(config.model, "heuristic");
        assert_eq!(config.ignore_failure, IgnoreFailurePolicy::FailClosed);
        assert_eq!(config.match_mode, MatchMode::Substring);
    }

    #[test]
    fn test_local_backend_rejects_unknown_model() {
        let temp = tempdir().unwrap();
        let root = temp.path().to_str().unwrap();
        let cli = parse(&["--root", root, "--backend", "local", "--model", "nope"]);
        assert!(cli.to_config().is_err());
    }

    #[test]
    fn test_missing_root() {
        let cli = parse(&["--root", "/definitely/not/here", "--api-key", "k"]);
        let err = cli.to_config().unwrap_err();
        assert!(err.to_string().contains("Root directory not found"));
    }

    #[test]
    fn test_unknown_backend_rejected_by_parser() {
        assert!(Cli::try_parse_from(["tokcensus", "--backend", "openai"]).is_err());
    }
}
