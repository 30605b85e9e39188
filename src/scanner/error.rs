// Error types for the scan pipeline.
// Traversal errors aggregate into one scan-level error; measurement errors
// stay attached to the result item they belong to.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// A single non-fatal error encountered while walking the tree.
#[derive(Debug)]
pub struct WalkError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "walk error at {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for WalkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// All traversal errors from one scan, rendered as a single message.
#[derive(Debug)]
pub struct ScanError {
    errors: Vec<WalkError>,
}

impl ScanError {
    /// Collapse a list of walk errors into one scan error, or `None` if the
    /// walk was clean.
    pub fn combine(errors: Vec<WalkError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[WalkError] {
        &self.errors
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.len() == 1 {
            return write!(f, "{}", self.errors[0]);
        }
        write!(f, "multiple errors:")?;
        for e in &self.errors {
            write!(f, "\n - {}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScanError {}

/// Error recorded against a single measured directory. The item's size still
/// reflects whatever partial sum was accumulated before the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasureError {
    /// The measurement observed cancellation between entries.
    Cancelled,
    /// First I/O error seen under the directory.
    Io { path: PathBuf, message: String },
}

impl MeasureError {
    pub fn io(path: &std::path::Path, err: &io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::Io { path, message } => write!(f, "{}: {}", path.display(), message),
        }
    }
}

impl std::error::Error for MeasureError {}
