//! Scan configuration.

/// Directory basename the scanner hunts for unless overridden.
pub const DEFAULT_TARGET_NAME: &str = "node_modules";

/// Behavior of a single scan invocation. Immutable once the scan starts.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Worker threads for size measurement. 0 means hardware parallelism.
    pub workers: usize,
    /// Maximum traversal depth relative to the root (root itself is 0).
    /// `None` is unlimited.
    pub max_depth: Option<usize>,
    /// Follow symlinked directories when computing sizes (pnpm-style trees).
    pub follow_symlinks: bool,
    /// Glob patterns to exclude; each is matched against the full path and
    /// the basename. Any match excludes the directory entirely.
    pub excludes: Vec<String>,
    /// Basename of the directories to find.
    pub target_name: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            max_depth: None,
            follow_symlinks: false,
            excludes: Vec::new(),
            target_name: DEFAULT_TARGET_NAME.to_string(),
        }
    }
}

impl ScanOptions {
    /// Worker count with the auto default applied, floored at 1.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}
