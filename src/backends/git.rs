//! git integration
//!
//! Asks `git check-ignore` whether a path is ignored, one process per query.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::backends::IgnoreOracle;
use crate::core::error::IgnoreQueryError;
use crate::core::util::command_exists;

/// Default time allowed for one `git check-ignore` call
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// What a failed ignore query means for the path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnoreFailurePolicy {
    /// Treat the path as not ignored
    #[default]
    FailOpen,
    /// Treat the path as ignored
    FailClosed,
}

/// Check if git is available
pub fn is_git_available() -> bool {
    command_exists("git")
}

/// Whether `target` names git's own metadata directory
///
/// Case-insensitive suffix match, so `repo.GIT` counts as well.
pub fn is_git_metadata(target: &str) -> bool {
    target.to_lowercase().ends_with(".git")
}

/// Ignore oracle backed by the `git` binary
#[derive(Debug, Clone)]
pub struct GitIgnoreOracle {
    program: PathBuf,
    timeout: Duration,
    policy: IgnoreFailurePolicy,
}

impl Default for GitIgnoreOracle {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_TIMEOUT, IgnoreFailurePolicy::default())
    }
}

impl GitIgnoreOracle {
    pub fn new(timeout: Duration, policy: IgnoreFailurePolicy) -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout,
            policy,
        }
    }

    /// Use another `git` executable
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Run `git -C <root> check-ignore -z <target>`
    ///
    /// Exit status 0 and 1 are answers; the target is ignored iff git echoes
    /// it back as one NUL-terminated entry. `-z` keeps git from quoting
    /// non-ASCII names. Anything else is a query failure.
    pub fn query(&self, root: &Path, target: &str) -> Result<bool, IgnoreQueryError> {
        let mut child = Command::new(&self.program)
            .arg("-C")
            .arg(root)
            .arg("check-ignore")
            .arg("-z")
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let status = wait_with_timeout(&mut child, self.timeout)?;

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }

        match status.code() {
            Some(0) | Some(1) => Ok(stdout.split('\0').any(|entry| entry == target)),
            code => {
                let mut stderr = String::new();
                if let Some(mut err) = child.stderr.take() {
                    err.read_to_string(&mut stderr)?;
                }
                Err(IgnoreQueryError::Status {
                    code,
                    stderr: stderr.trim().to_string(),
                })
            }
        }
    }
}

impl IgnoreOracle for GitIgnoreOracle {
    fn is_ignored(&self, root: &Path, target: &str) -> bool {
        if is_git_metadata(target) {
            return true;
        }

        match self.query(root, target) {
            Ok(ignored) => {
                debug!(target, ignored, "git check-ignore");
                ignored
            }
            Err(e) => {
                let ignored = self.policy == IgnoreFailurePolicy::FailClosed;
                warn!(target, error = %e, treat_as_ignored = ignored, "ignore query failed");
                ignored
            }
        }
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, IgnoreQueryError> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(IgnoreQueryError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
