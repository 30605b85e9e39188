//! Scanner module - concurrent discovery and measurement of node_modules
//! directories.
//!
//! A single walker discovers target directories; a bounded worker pool
//! measures their sizes, either collected as a batch or streamed as results
//! complete.

pub mod classify;
pub mod error;
pub mod measure;
pub mod options;
pub mod scan;
pub mod walker;

pub use classify::{Classifier, Verdict};
pub use error::{MeasureError, ScanError, WalkError};
pub use measure::dir_size;
pub use options::{ScanOptions, DEFAULT_TARGET_NAME};
pub use scan::{scan, scan_stream, ResultItem, ScanOutcome};
pub use walker::TreeWalker;
