//! Tree walker - top-down traversal feeding the token counter
//!
//! Directories are checked against the ignore set first, then the oracle;
//! an ignored directory is pruned so nothing below it costs a query or a
//! count. Files surviving their own oracle query are read as UTF-8 and
//! counted exactly once.

use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::backends::{IgnoreOracle, TokenCounter};
use crate::core::error::CensusError;
use crate::core::ignore_set::{IgnoreSet, MatchMode};
use crate::core::model::FileRecord;
use crate::core::paths::path_key;
use crate::core::util::CancelToken;

/// One census traversal over `root`
pub struct TreeWalker<'a> {
    root: &'a Path,
    model: &'a str,
    oracle: &'a dyn IgnoreOracle,
    counter: &'a dyn TokenCounter,
    ignored: IgnoreSet,
    cancel: CancelToken,
    quiet: bool,
    skipped: usize,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        root: &'a Path,
        model: &'a str,
        oracle: &'a dyn IgnoreOracle,
        counter: &'a dyn TokenCounter,
    ) -> Self {
        Self {
            root,
            model,
            oracle,
            counter,
            ignored: IgnoreSet::default(),
            cancel: CancelToken::new(),
            quiet: false,
            skipped: 0,
        }
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.ignored = IgnoreSet::new(mode);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Paths confirmed ignored so far
    pub fn ignored(&self) -> &IgnoreSet {
        &self.ignored
    }

    /// Files skipped because they could not be read as text
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Walk the tree and count every included file
    pub fn collect(&mut self) -> Result<Vec<FileRecord>, CensusError> {
        let mut records = Vec::new();
        let mut entries = WalkDir::new(self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            // The root itself is never ignored
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            let key = path_key(path, self.root);

            if entry.file_type().is_dir() {
                if self.ignored.is_in_ignored_subtree(&key) {
                    self.progress("ignoring dir", &key);
                    entries.skip_current_dir();
                    continue;
                }
                self.cancel.check()?;
                if self.oracle.is_ignored(self.root, &key) {
                    self.progress("ignoring dir", &key);
                    self.ignored.insert(key);
                    entries.skip_current_dir();
                }
                continue;
            }

            // Symlinks count when they resolve to a regular file
            if !path.is_file() {
                debug!(path = %key, "skipping non-regular entry");
                continue;
            }

            self.cancel.check()?;
            if self.oracle.is_ignored(self.root, &key) {
                self.progress("ignoring file", &key);
                self.ignored.insert(key);
                continue;
            }

            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    if e.kind() == io::ErrorKind::InvalidData {
                        debug!(path = %key, "skipping non-UTF-8 file");
                    } else {
                        warn!(path = %key, error = %e, "skipping unreadable file");
                    }
                    self.skipped += 1;
                    continue;
                }
            };

            self.progress("counting tokens", &key);
            self.cancel.check()?;
            let tokens = self
                .counter
                .count_tokens(self.model, &content)
                .map_err(|source| CensusError::Count {
                    path: key.clone(),
                    source,
                })?;

            records.push(FileRecord::new(key, tokens));
        }

        debug!(
            files = records.len(),
            ignored = self.ignored.len(),
            skipped = self.skipped,
            "walk finished"
        );
        Ok(records)
    }

    fn progress(&self, label: &str, path: &str) {
        if !self.quiet {
            println!("{}: {}", label.cyan(), path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::git::is_git_metadata;
    use crate::core::error::CountError;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    /// Oracle answering from a fixed set, recording every query
    #[derive(Default)]
    struct FixedOracle {
        ignored: HashSet<String>,
        queries: RefCell<Vec<String>>,
    }

    impl FixedOracle {
        fn ignoring(paths: &[&str]) -> Self {
            Self {
                ignored: paths.iter().map(|p| p.to_string()).collect(),
                queries: RefCell::default(),
            }
        }

        fn queried(&self, path: &str) -> bool {
            self.queries.borrow().iter().any(|q| q == path)
        }
    }

    impl IgnoreOracle for FixedOracle {
        fn is_ignored(&self, _root: &Path, target: &str) -> bool {
            if is_git_metadata(target) {
                return true;
            }
            self.queries.borrow_mut().push(target.to_string());
            self.ignored.contains(target)
        }
    }

    /// Counter returning the byte length of the content
    #[derive(Default)]
    struct LenCounter {
        calls: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl TokenCounter for LenCounter {
        fn count_tokens(&self, model: &str, content: &str) -> Result<u64, CountError> {
            assert_eq!(model, "test-model");
            self.calls.borrow_mut().push(content.to_string());
            if self.fail_on.is_some_and(|f| f == content) {
                return Err(CountError::Auth {
                    status: 401,
                    message: "bad key".into(),
                });
            }
            Ok(content.len() as u64)
        }
    }

    fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    fn sample_tree() -> TempDir {
        let temp = tempdir().unwrap();
        write(temp.path(), "a.txt", b"0123456789");
        write(temp.path(), "b.txt", b"abcde");
        write(temp.path(), ".git/config", b"[core]");
        temp
    }

    #[test]
    fn test_git_dir_excluded() {
        let temp = sample_tree();
        let oracle = FixedOracle::default();
        let counter = LenCounter::default();

        let mut walker = TreeWalker::new(temp.path(), "test-model", &oracle, &counter).quiet(true);
        let records = walker.collect().unwrap();

        assert_eq!(
            records,
            vec![FileRecord::new("a.txt", 10), FileRecord::new("b.txt", 5)]
        );
        assert_eq!(walker.ignored().iter().collect::<Vec<_>>(), vec![".git"]);
        assert_eq!(counter.calls.borrow().len(), 2);
    }

    #[test]
    fn test_ignored_dir_pruned_without_calls() {
        let temp = tempdir().unwrap();
        write(temp.path(), "build/one.o", b"1");
        write(temp.path(), "build/two.o", b"22");
        write(temp.path(), "build/nested/three.o", b"333");
        write(temp.path(), "src/lib.rs", b"pub fn f() {}");

        let oracle = FixedOracle::ignoring(&["build"]);
        let counter = LenCounter::default();
        let mut walker = TreeWalker::new(temp.path(), "test-model", &oracle, &counter).quiet(true);
        let records = walker.collect().unwrap();

        assert_eq!(paths(&records), vec!["src/lib.rs"]);
        assert_eq!(counter.calls.borrow().as_slice(), ["pub fn f() {}"]);
        assert!(oracle.queried("build"));
        assert!(!oracle.queried("build/one.o"));
        assert!(!oracle.queried("build/nested"));
    }

    #[test]
    fn test_ignored_file_skipped_and_recorded() {
        let temp = tempdir().unwrap();
        write(temp.path(), "keep.rs", b"x");
        write(temp.path(), "debug.log", b"noise");

        let oracle = FixedOracle::ignoring(&["debug.log"]);
        let counter = LenCounter::default();
        let mut walker = TreeWalker::new(temp.path(), "test-model", &oracle, &counter).quiet(true);
        let records = walker.collect().unwrap();

        assert_eq!(paths(&records), vec!["keep.rs"]);
        assert!(walker.ignored().is_in_ignored_subtree("debug.log"));
    }

    #[test]
    fn test_invalid_utf8_skipped() {
        let temp = tempdir().unwrap();
        write(temp.path(), "one.txt", b"one");
        write(temp.path(), "two.txt", b"two!");
        write(temp.path(), "blob.bin", &[0xff, 0xfe, 0x00, 0x80]);

        let oracle = FixedOracle::default();
        let counter = LenCounter::default();
        let mut walker = TreeWalker::new(temp.path(), "test-model", &oracle, &counter).quiet(true);
        let records = walker.collect().unwrap();

        assert_eq!(paths(&records), vec!["one.txt", "two.txt"]);
        assert_eq!(walker.skipped(), 1);
        assert_eq!(counter.calls.borrow().len(), 2);
    }

    #[test]
    fn test_each_path_queried_once() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a/b/c.txt", b"c");
        write(temp.path(), "a/d.txt", b"d");

        let oracle = FixedOracle::default();
        let counter = LenCounter::default();
        TreeWalker::new(temp.path(), "test-model", &oracle, &counter)
            .quiet(true)
            .collect()
            .unwrap();

        let mut queries = oracle.queries.borrow().clone();
        queries.sort();
        assert_eq!(queries, vec!["a", "a/b", "a/b/c.txt", "a/d.txt"]);
    }

    #[test]
    fn test_nested_paths_are_root_relative() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/core/model.rs", b"struct M;");

        let oracle = FixedOracle::default();
        let counter = LenCounter::default();
        let records = TreeWalker::new(temp.path(), "test-model", &oracle, &counter)
            .quiet(true)
            .collect()
            .unwrap();

        assert_eq!(paths(&records), vec!["src/core/model.rs"]);
    }

    #[test]
    fn test_empty_file_still_counted() {
        let temp = tempdir().unwrap();
        write(temp.path(), "empty.txt", b"");

        let oracle = FixedOracle::default();
        let counter = LenCounter::default();
        let records = TreeWalker::new(temp.path(), "test-model", &oracle, &counter)
            .quiet(true)
            .collect()
            .unwrap();

        assert_eq!(records, vec![FileRecord::new("empty.txt", 0)]);
        assert_eq!(counter.calls.borrow().len(), 1);
    }

    #[test]
    fn test_count_failure_names_path() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a.txt", b"fine");
        write(temp.path(), "b.txt", b"boom");

        let oracle = FixedOracle::default();
        let counter = LenCounter {
            fail_on: Some("boom"),
            ..Default::default()
        };
        let err = TreeWalker::new(temp.path(), "test-model", &oracle, &counter)
            .quiet(true)
            .collect()
            .unwrap_err();

        match err {
            CensusError::Count { path, source } => {
                assert_eq!(path, "b.txt");
                assert!(matches!(source, CountError::Auth { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_before_any_call() {
        let temp = sample_tree();
        let oracle = FixedOracle::default();
        let counter = LenCounter::default();
        let token = CancelToken::new();
        token.cancel();

        let err = TreeWalker::new(temp.path(), "test-model", &oracle, &counter)
            .quiet(true)
            .cancel_token(token)
            .collect()
            .unwrap_err();

        assert!(matches!(err, CensusError::Cancelled));
        assert!(counter.calls.borrow().is_empty());
    }

    #[test]
    fn test_gitignored_non_ascii_name_gets_no_record() {
        use crate::backends::git::{is_git_available, GitIgnoreOracle};
        use std::process::Command;

        if !is_git_available() {
            return;
        }
        let temp = tempdir().unwrap();
        let status = Command::new("git")
            .arg("init")
            .arg("-q")
            .arg(temp.path())
            .status()
            .unwrap();
        assert!(status.success());
        write(temp.path(), ".gitignore", b"*.log\n");
        write(temp.path(), "café.log", b"noise");
        write(temp.path(), "naïve/kept.md", b"kept");

        let oracle = GitIgnoreOracle::default();
        let counter = LenCounter::default();
        let mut walker = TreeWalker::new(temp.path(), "test-model", &oracle, &counter).quiet(true);
        let records = walker.collect().unwrap();

        assert_eq!(paths(&records), vec![".gitignore", "naïve/kept.md"]);
        assert!(walker.ignored().is_in_ignored_subtree("café.log"));
    }

    #[test]
    fn test_rerun_is_stable() {
        let temp = sample_tree();
        write(temp.path(), "z/y/x.md", b"# title");
        let oracle = FixedOracle::default();
        let counter = LenCounter::default();

        let first = TreeWalker::new(temp.path(), "test-model", &oracle, &counter)
            .quiet(true)
            .collect()
            .unwrap();
        let second = TreeWalker::new(temp.path(), "test-model", &oracle, &counter)
            .quiet(true)
            .collect()
            .unwrap();

        assert_eq!(first, second);
    }
}
