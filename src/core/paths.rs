//! Path normalization utilities
//!
//! Every path that reaches the ignore oracle, the ignore set, or a report is
//! normalized to use '/' as separator and is relative to root.

use std::path::Path;

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Identity string of a traversed path
///
/// Falls back to the full normalized path when `path` is not under `root`.
pub fn path_key(path: &Path, root: &Path) -> String {
    make_relative(path, root).unwrap_or_else(|| normalize_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Path::new("src/main.rs");
        assert_eq!(normalize_path(path), "src/main.rs");
    }

    #[test]
    fn test_make_relative() {
        let root = Path::new("/project");
        let path = Path::new("/project/src/main.rs");
        assert_eq!(make_relative(path, root), Some("src/main.rs".to_string()));
    }

    #[test]
    fn test_make_relative_not_under_root() {
        let root = Path::new("/project");
        let path = Path::new("/other/file.rs");
        assert_eq!(make_relative(path, root), None);
    }

    #[test]
    fn test_path_key_falls_back_to_full_path() {
        let root = Path::new("/project");
        assert_eq!(path_key(Path::new("/project/a/b.txt"), root), "a/b.txt");
        assert_eq!(path_key(Path::new("/elsewhere/c.txt"), root), "/elsewhere/c.txt");
    }
}
