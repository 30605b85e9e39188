//! Per-entry traversal verdicts.
//!
//! Pure decisions over what the walker already knows about an entry; the
//! only I/O behind these answers is the lstat the walker performed.

use std::path::Path;

use glob::{MatchOptions, Pattern};

use super::options::ScanOptions;

/// What the walker should do with a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A target directory: report it, do not descend into it.
    Matched,
    /// Excluded by pattern: skip entirely, do not descend.
    Excluded,
    /// Beyond the configured depth: skip, do not descend.
    TooDeep,
    /// Symlinked directory: do not descend, do not match.
    SkipSymlink,
    /// Ordinary directory: descend.
    Descend,
}

/// Compiled exclusion set plus match parameters for one scan.
pub struct Classifier {
    patterns: Vec<Pattern>,
    max_depth: Option<usize>,
    target_name: String,
}

// `*` must not cross a path separator: exclusion globs match by literal
// segment count, so `*/a/*` cannot span arbitrarily many directories.
const MATCH_OPTS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl Classifier {
    /// Compile the exclusion patterns once per scan. Empty and invalid
    /// patterns are skipped rather than failing the scan.
    pub fn new(opts: &ScanOptions) -> Self {
        let patterns = opts
            .excludes
            .iter()
            .filter(|p| !p.is_empty())
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self {
            patterns,
            max_depth: opts.max_depth,
            target_name: opts.target_name.clone(),
        }
    }

    /// Decide what to do with one entry. `depth` is relative to the scan
    /// root (the root itself is depth 0). `is_dir`/`is_symlink` come from
    /// lstat, so a symlink to a directory reports `is_dir == false`.
    pub fn classify(&self, path: &Path, depth: usize, is_dir: bool, is_symlink: bool) -> Verdict {
        if is_dir && self.is_excluded(path) {
            return Verdict::Excluded;
        }
        if let Some(max) = self.max_depth {
            if depth > max {
                return Verdict::TooDeep;
            }
        }
        if is_dir && path.file_name().is_some_and(|n| n == self.target_name.as_str()) {
            return Verdict::Matched;
        }
        if is_symlink {
            return Verdict::SkipSymlink;
        }
        // Regular files also land here; the walker only recurses into
        // directories, so Descend means "nothing to do" for them.
        Verdict::Descend
    }

    /// A directory is excluded when any pattern matches its full path or its
    /// basename.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let full = path.to_string_lossy();
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.patterns
            .iter()
            .any(|p| p.matches_with(&full, MATCH_OPTS) || p.matches_with(&base, MATCH_OPTS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn opts(excludes: &[&str], max_depth: Option<usize>) -> ScanOptions {
        ScanOptions {
            excludes: excludes.iter().map(|s| s.to_string()).collect(),
            max_depth,
            ..ScanOptions::default()
        }
    }

    #[test]
    fn matches_target_directories_only() {
        let c = Classifier::new(&opts(&[], None));
        assert_eq!(
            c.classify(Path::new("/r/a/node_modules"), 2, true, false),
            Verdict::Matched
        );
        // a file named node_modules is not a target
        assert_eq!(
            c.classify(Path::new("/r/a/node_modules"), 2, false, false),
            Verdict::Descend
        );
        // name match is exact and case-sensitive
        assert_eq!(
            c.classify(Path::new("/r/a/Node_Modules"), 2, true, false),
            Verdict::Descend
        );
    }

    #[test]
    fn depth_cutoff_is_exclusive() {
        let c = Classifier::new(&opts(&[], Some(2)));
        assert_eq!(
            c.classify(Path::new("/r/a/node_modules"), 2, true, false),
            Verdict::Matched
        );
        assert_eq!(
            c.classify(Path::new("/r/a/b/node_modules"), 3, true, false),
            Verdict::TooDeep
        );
    }

    #[test]
    fn exclusion_beats_matching() {
        let c = Classifier::new(&opts(&["node_modules"], None));
        assert_eq!(
            c.classify(Path::new("/r/node_modules"), 1, true, false),
            Verdict::Excluded
        );
    }

    #[test]
    fn symlinked_directories_are_skipped() {
        let c = Classifier::new(&opts(&[], None));
        assert_eq!(
            c.classify(Path::new("/r/link"), 1, false, true),
            Verdict::SkipSymlink
        );
    }

    #[test]
    fn glob_star_stays_within_one_segment() {
        let c = Classifier::new(&opts(&["*/a/*"], None));
        assert!(c.is_excluded(Path::new("root/a/node_modules")));
        // literal segment count: four segments cannot satisfy a
        // three-segment pattern
        assert!(!c.is_excluded(Path::new("/tmp/root/a/node_modules")));
    }

    #[test]
    fn basename_patterns_match_anywhere() {
        let c = Classifier::new(&opts(&["node_modules"], None));
        assert!(c.is_excluded(Path::new("/very/deep/tree/node_modules")));
        assert!(!c.is_excluded(Path::new("/very/deep/tree/src")));
    }

    #[test]
    fn full_path_patterns_match_that_path_only() {
        let c = Classifier::new(&opts(&["/r/a/node_modules"], None));
        assert!(c.is_excluded(Path::new("/r/a/node_modules")));
        assert!(!c.is_excluded(Path::new("/r/b/node_modules")));
    }

    #[test]
    fn invalid_patterns_are_ignored() {
        let c = Classifier::new(&opts(&["[", "b*"], None));
        assert!(c.is_excluded(Path::new("/r/build")));
        assert!(!c.is_excluded(Path::new("/r/src")));
    }
}
