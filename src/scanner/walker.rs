//! Single-pass directory traversal.
//!
//! One walker per scan. It applies the classifier at every directory entry,
//! emits matched targets without descending into them, and collects
//! traversal errors instead of failing the scan.

use std::fs;
use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;

use super::classify::{Classifier, Verdict};
use super::error::WalkError;
use super::options::ScanOptions;
use crate::cancel::CancelToken;

/// Depth-first walker over the scan root.
pub struct TreeWalker {
    root: PathBuf,
    classifier: Classifier,
    errors: Vec<WalkError>,
    cancel: CancelToken,
}

impl TreeWalker {
    pub fn new(root: &Path, opts: &ScanOptions, cancel: CancelToken) -> Self {
        Self {
            root: root.to_path_buf(),
            classifier: Classifier::new(opts),
            errors: Vec::new(),
            cancel,
        }
    }

    /// Walk the whole tree and return every candidate found, plus the
    /// traversal errors accumulated along the way.
    pub fn collect(mut self) -> (Vec<PathBuf>, Vec<WalkError>) {
        let mut candidates = Vec::new();
        self.walk(&mut |path| {
            candidates.push(path);
            true
        });
        (candidates, self.errors)
    }

    /// Walk the tree, pushing each candidate onto `jobs` as soon as it is
    /// found. Stops promptly on cancellation or when the receiving side is
    /// gone. Returns the traversal errors.
    pub fn stream(mut self, jobs: Sender<PathBuf>) -> Vec<WalkError> {
        self.walk(&mut |path| jobs.send(path).is_ok());
        self.errors
    }

    /// Core traversal. `emit` returns false when no more candidates can be
    /// accepted, which stops the walk.
    fn walk(&mut self, emit: &mut dyn FnMut(PathBuf) -> bool) {
        let root = self.root.clone();
        // The root itself is classified at depth 0: a scan rooted at a
        // directory named like the target reports just that directory.
        let meta = match fs::symlink_metadata(&root) {
            Ok(m) => m,
            Err(e) => {
                self.record(&root, e);
                return;
            }
        };
        match self
            .classifier
            .classify(&root, 0, meta.is_dir(), meta.file_type().is_symlink())
        {
            Verdict::Matched => {
                emit(root);
            }
            Verdict::Descend if meta.is_dir() => {
                self.walk_dir(&root, 1, emit);
            }
            _ => {}
        }
    }

    /// Visit the entries of one directory. Returns false to abort the walk.
    fn walk_dir(&mut self, dir: &Path, depth: usize, emit: &mut dyn FnMut(PathBuf) -> bool) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                // Unreadable directory: record and move on.
                self.record(dir, e);
                return true;
            }
        };
        for entry in entries {
            if self.cancel.is_cancelled() {
                return false;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.record(dir, e);
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    self.record(&path, e);
                    continue;
                }
            };
            match self
                .classifier
                .classify(&path, depth, file_type.is_dir(), file_type.is_symlink())
            {
                Verdict::Matched => {
                    // Report the outermost match only; never look inside.
                    if !emit(path) {
                        return false;
                    }
                }
                Verdict::Descend => {
                    if file_type.is_dir() && !self.walk_dir(&path, depth + 1, emit) {
                        return false;
                    }
                }
                Verdict::Excluded | Verdict::TooDeep | Verdict::SkipSymlink => {}
            }
        }
        true
    }

    fn record(&mut self, path: &Path, source: std::io::Error) {
        self.errors.push(WalkError {
            path: path.to_path_buf(),
            source,
        });
    }
}
