//! Recursive directory size measurement.
//!
//! Partial sums survive errors: the first error under a directory is
//! recorded, the walk keeps going, and the caller gets whatever total was
//! reachable. The cycle guard lives for a single measurement call so one
//! target's links can never poison another's.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::MeasureError;
use crate::cancel::CancelToken;

/// Total size in bytes of all regular files under `root`.
///
/// With `follow_symlinks` set, each distinct resolved directory is counted
/// once; cycles and diamonds terminate via the per-call `seen` set. Without
/// it, symlinked entries contribute nothing.
pub fn dir_size(root: &Path, follow_symlinks: bool, cancel: &CancelToken) -> (u64, Option<MeasureError>) {
    let mut seen = HashSet::new();
    if follow_symlinks {
        // Guard against links that lead back into the measured root.
        if let Ok(real) = fs::canonicalize(root) {
            seen.insert(real);
        }
    }
    let mut state = MeasureState {
        total: 0,
        first_err: None,
        seen,
        follow_symlinks,
        cancel,
    };
    state.visit(root);
    (state.total, state.first_err)
}

struct MeasureState<'a> {
    total: u64,
    first_err: Option<MeasureError>,
    seen: HashSet<PathBuf>,
    follow_symlinks: bool,
    cancel: &'a CancelToken,
}

impl MeasureState<'_> {
    fn record(&mut self, err: MeasureError) {
        if self.first_err.is_none() {
            self.first_err = Some(err);
        }
    }

    /// Returns false once cancellation has been observed; the partial total
    /// accumulated so far stands.
    fn visit(&mut self, dir: &Path) -> bool {
        if self.check_cancelled() {
            return false;
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.record(MeasureError::io(dir, &e));
                return true;
            }
        };
        for entry in entries {
            if self.check_cancelled() {
                return false;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.record(MeasureError::io(dir, &e));
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    self.record(MeasureError::io(&path, &e));
                    continue;
                }
            };
            if file_type.is_symlink() {
                if self.follow_symlinks {
                    if !self.follow(&path) {
                        return false;
                    }
                }
                // Not following: the link contributes nothing.
                continue;
            }
            if file_type.is_dir() {
                if !self.visit(&path) {
                    return false;
                }
                continue;
            }
            match entry.metadata() {
                Ok(meta) => self.total += meta.len(),
                Err(e) => self.record(MeasureError::io(&path, &e)),
            }
        }
        true
    }

    /// Resolve one symlink and count its target, once per real path.
    fn follow(&mut self, link: &Path) -> bool {
        let meta = match fs::metadata(link) {
            Ok(m) => m,
            Err(e) => {
                // Dangling link; record and keep walking.
                self.record(MeasureError::io(link, &e));
                return true;
            }
        };
        if meta.is_dir() {
            let real = match fs::canonicalize(link) {
                Ok(r) => r,
                Err(e) => {
                    self.record(MeasureError::io(link, &e));
                    return true;
                }
            };
            if self.seen.insert(real.clone()) {
                return self.visit(&real);
            }
            return true;
        }
        // Symlink to a regular file: count the target once per real path.
        match fs::canonicalize(link) {
            Ok(real) => {
                if self.seen.insert(real) {
                    self.total += meta.len();
                }
            }
            Err(e) => self.record(MeasureError::io(link, &e)),
        }
        true
    }

    fn check_cancelled(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.record(MeasureError::Cancelled);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_bytes(path: &Path, len: usize) {
        let mut f = File::create(path).unwrap();
        f.write_all(&vec![0u8; len]).unwrap();
    }

    #[test]
    fn sums_regular_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        write_bytes(&dir.path().join("a.bin"), 1024);
        write_bytes(&dir.path().join("sub/b.bin"), 2048);

        let (size, err) = dir_size(dir.path(), false, &CancelToken::new());
        assert!(err.is_none());
        assert_eq!(size, 3072);
    }

    #[test]
    fn missing_directory_reports_error_with_zero_size() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let (size, err) = dir_size(&gone, false, &CancelToken::new());
        assert_eq!(size, 0);
        assert!(matches!(err, Some(MeasureError::Io { .. })));
    }

    #[test]
    fn cancelled_measurement_reports_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        write_bytes(&dir.path().join("a.bin"), 10);
        let cancel = CancelToken::new();
        cancel.cancel();
        let (_, err) = dir_size(dir.path(), false, &cancel);
        assert_eq!(err, Some(MeasureError::Cancelled));
    }

    #[cfg(unix)]
    #[test]
    fn unfollowed_symlinks_contribute_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        write_bytes(&real.join("data.bin"), 4096);
        let scanned = dir.path().join("scanned");
        fs::create_dir(&scanned).unwrap();
        std::os::unix::fs::symlink(&real, scanned.join("link")).unwrap();

        let (size, err) = dir_size(&scanned, false, &CancelToken::new());
        assert!(err.is_none());
        assert_eq!(size, 0);
    }

    #[cfg(unix)]
    #[test]
    fn followed_symlinks_count_once_and_terminate_on_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let scanned = dir.path().join("scanned");
        fs::create_dir(&scanned).unwrap();
        write_bytes(&scanned.join("data.bin"), 100);
        let shared = dir.path().join("shared");
        fs::create_dir(&shared).unwrap();
        write_bytes(&shared.join("big.bin"), 1000);
        // diamond: two links to the same directory
        std::os::unix::fs::symlink(&shared, scanned.join("link1")).unwrap();
        std::os::unix::fs::symlink(&shared, scanned.join("link2")).unwrap();
        // cycle back into the measured tree
        std::os::unix::fs::symlink(&scanned, shared.join("back")).unwrap();

        let (size, err) = dir_size(&scanned, true, &CancelToken::new());
        assert!(err.is_none(), "unexpected error: {:?}", err);
        assert_eq!(size, 1100);
    }
}
