//! Ignore set - paths already confirmed ignored during one run
//!
//! Consulted before asking the ignore oracle so that nothing below an
//! ignored directory costs another `git` process.

use std::path::Path;

/// How an ignore set entry covers a target path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Entry equals the target or is one of its ancestors (segment-wise)
    #[default]
    Ancestor,
    /// Entry string occurs anywhere in the target string
    ///
    /// Over-matches: an ignored `foo/bar` also covers `foo/barred`.
    Substring,
}

/// Ordered, grow-only collection of ignored paths
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    entries: Vec<String>,
    mode: MatchMode,
}

impl IgnoreSet {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            entries: Vec::new(),
            mode,
        }
    }

    /// Record a path confirmed ignored
    pub fn insert(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.entries.contains(&path) {
            self.entries.push(path);
        }
    }

    /// Whether `target` lies inside (or is) an already-ignored path
    pub fn is_in_ignored_subtree(&self, target: &str) -> bool {
        match self.mode {
            MatchMode::Ancestor => {
                let target = Path::new(target);
                self.entries
                    .iter()
                    .any(|entry| target.starts_with(Path::new(entry)))
            }
            MatchMode::Substring => self.entries.iter().any(|entry| target.contains(entry)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = IgnoreSet::default();
        assert!(!set.is_in_ignored_subtree("src/main.rs"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_ancestor_match() {
        let mut set = IgnoreSet::new(MatchMode::Ancestor);
        set.insert("foo/bar");

        assert!(set.is_in_ignored_subtree("foo/bar"));
        assert!(set.is_in_ignored_subtree("foo/bar/baz.txt"));
        assert!(set.is_in_ignored_subtree("foo/bar/deep/er"));
        assert!(!set.is_in_ignored_subtree("foo/barred"));
        assert!(!set.is_in_ignored_subtree("foo"));
        assert!(!set.is_in_ignored_subtree("x/foo/bar"));
    }

    #[test]
    fn test_substring_match_keeps_legacy_overmatch() {
        let mut set = IgnoreSet::new(MatchMode::Substring);
        set.insert("foo/bar");

        assert!(set.is_in_ignored_subtree("foo/bar/baz.txt"));
        assert!(set.is_in_ignored_subtree("foo/barred"));
        assert!(set.is_in_ignored_subtree("x/foo/bar"));
        assert!(!set.is_in_ignored_subtree("foo/ba"));
    }

    #[test]
    fn test_insert_is_idempotent_and_ordered() {
        let mut set = IgnoreSet::default();
        set.insert("build");
        set.insert(".git");
        set.insert("build");

        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["build", ".git"]);
    }
}
