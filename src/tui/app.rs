//! TUI application state.
//!
//! An explicit state machine driven by typed messages: the pipelines run on
//! background threads and everything they produce arrives over one channel,
//! drained by the event loop. No shared mutable state crosses the boundary.

use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::archiver::{compress_targets, ArchiveOptions, ArchiveProgress, ArchiveSummary};
use crate::cancel::CancelToken;
use crate::deleter::{delete_targets, Failure, Progress, Summary};
use crate::scanner::{scan_stream, ResultItem, ScanError, ScanOptions};
use crate::targets::Target;

/// Which screen the TUI is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Scanning,
    Ready,
    ConfirmDelete,
    Deleting,
    Done,
    ConfirmArchive,
    Archiving,
    ArchiveDone,
}

/// Sort field for the result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Size,
    Path,
}

/// Everything the background threads report to the event loop.
pub enum Msg {
    ScanItem(ResultItem),
    ScanDone(Option<ScanError>),
    DeleteProgress(Progress),
    DeleteDone(Summary),
    ArchiveProgress(ArchiveProgress),
    ArchiveDone(ArchiveSummary),
}

/// One row of the result list.
pub struct Item {
    pub path: PathBuf,
    pub display: String,
    pub size: u64,
    pub error: Option<String>,
    pub marked_delete: bool,
    pub marked_archive: bool,
}

pub struct App {
    pub root: PathBuf,
    pub opts: ScanOptions,
    pub dry_run: bool,
    pub delete_after: bool,

    pub status: Status,
    pub should_quit: bool,
    pub started: Instant,

    pub items: Vec<Item>,
    pub total_size: u64,
    pub scan_err: Option<ScanError>,
    pub scanning: bool,

    pub cursor: usize,
    pub scroll: usize,
    pub list_height: usize,
    pub sort_by: SortBy,
    pub sort_reverse: bool,
    pub filter: String,
    pub filtering: bool,
    pub show_help: bool,
    pub last_g: bool,

    pub marked_delete_size: u64,
    pub marked_archive_size: u64,

    // live operation display
    pub op_completed: usize,
    pub op_total: usize,
    pub op_last_path: String,
    pub op_last_dest: String,
    pub op_written: u64,
    pub op_freed: u64,
    pub op_failures: Vec<Failure>,

    msg_tx: Sender<Msg>,
    msg_rx: Receiver<Msg>,
    scan_cancel: CancelToken,
    op_cancel: Option<CancelToken>,
}

impl App {
    /// Build the app and kick off the streaming scan immediately.
    pub fn new(root: PathBuf, opts: ScanOptions, dry_run: bool) -> Self {
        let (msg_tx, msg_rx) = bounded(256);
        let scan_cancel = CancelToken::new();

        let (items_rx, err_rx) = scan_stream(&root, &opts, &scan_cancel);
        let tx = msg_tx.clone();
        thread::spawn(move || {
            for item in items_rx.iter() {
                if tx.send(Msg::ScanItem(item)).is_err() {
                    return;
                }
            }
            let err = err_rx.recv().unwrap_or(None);
            let _ = tx.send(Msg::ScanDone(err));
        });

        Self {
            root,
            opts,
            dry_run,
            delete_after: true,
            status: Status::Scanning,
            should_quit: false,
            started: Instant::now(),
            items: Vec::new(),
            total_size: 0,
            scan_err: None,
            scanning: true,
            cursor: 0,
            scroll: 0,
            list_height: 20,
            sort_by: SortBy::Size,
            sort_reverse: true,
            filter: String::new(),
            filtering: false,
            show_help: false,
            last_g: false,
            marked_delete_size: 0,
            marked_archive_size: 0,
            op_completed: 0,
            op_total: 0,
            op_last_path: String::new(),
            op_last_dest: String::new(),
            op_written: 0,
            op_freed: 0,
            op_failures: Vec::new(),
            msg_tx,
            msg_rx,
            scan_cancel,
            op_cancel: None,
        }
    }

    /// Drain every pending pipeline message. Called once per event-loop tick.
    pub fn drain_messages(&mut self) {
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.on_msg(msg);
        }
    }

    fn on_msg(&mut self, msg: Msg) {
        match msg {
            Msg::ScanItem(item) => {
                if item.error.is_none() {
                    self.total_size += item.size;
                }
                let display = self.display_path(&item.path);
                self.items.push(Item {
                    path: item.path,
                    display,
                    size: item.size,
                    error: item.error.map(|e| e.to_string()),
                    marked_delete: false,
                    marked_archive: false,
                });
                self.apply_sort();
            }
            Msg::ScanDone(err) => {
                self.scan_err = err;
                self.scanning = false;
                if self.status == Status::Scanning {
                    self.status = Status::Ready;
                }
            }
            Msg::DeleteProgress(p) => {
                self.op_completed = p.completed;
                self.op_last_path = p.path.display().to_string();
            }
            Msg::DeleteDone(summary) => {
                self.op_freed = summary.freed;
                self.op_failures = summary.failures;
                let removed: Vec<PathBuf> =
                    summary.successes.into_iter().map(|t| t.path).collect();
                self.remove_items(&removed);
                self.marked_delete_size = 0;
                self.status = Status::Done;
                self.op_cancel = None;
            }
            Msg::ArchiveProgress(p) => {
                self.op_completed = p.completed;
                self.op_last_path = p.path.display().to_string();
                self.op_last_dest = p.dest.display().to_string();
                if p.error.is_none() {
                    self.op_written = p.bytes_written;
                }
            }
            Msg::ArchiveDone(summary) => {
                self.op_written = summary.written;
                self.op_failures = summary.failures;
                if self.delete_after {
                    let removed: Vec<PathBuf> =
                        summary.successes.into_iter().map(|s| s.path).collect();
                    self.remove_items(&removed);
                } else {
                    for item in &mut self.items {
                        item.marked_archive = false;
                    }
                }
                self.marked_archive_size = 0;
                self.status = Status::ArchiveDone;
                self.op_cancel = None;
            }
        }
    }

    fn display_path(&self, path: &std::path::Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
            _ => path.display().to_string(),
        }
    }

    /// Drop rows whose directories are gone; accounting follows the list.
    fn remove_items(&mut self, removed: &[PathBuf]) {
        if removed.is_empty() {
            return;
        }
        let gone: std::collections::HashSet<&PathBuf> = removed.iter().collect();
        let mut freed = 0u64;
        self.items.retain(|item| {
            if gone.contains(&item.path) {
                freed += item.size;
                false
            } else {
                true
            }
        });
        self.total_size = self.total_size.saturating_sub(freed);
        let visible = self.view_indexes().len();
        if self.cursor >= visible {
            self.cursor = visible.saturating_sub(1);
        }
        self.adjust_scroll();
    }

    // ---- list state ----------------------------------------------------

    /// Indexes of items matching the current filter, in list order.
    pub fn view_indexes(&self) -> Vec<usize> {
        if self.filter.is_empty() {
            return (0..self.items.len()).collect();
        }
        let needle = self.filter.to_lowercase();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                item.display.to_lowercase().contains(&needle)
                    || item.path.to_string_lossy().to_lowercase().contains(&needle)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn apply_sort(&mut self) {
        let reverse = self.sort_reverse;
        match self.sort_by {
            SortBy::Size => self.items.sort_by(|a, b| {
                if reverse {
                    b.size.cmp(&a.size)
                } else {
                    a.size.cmp(&b.size)
                }
            }),
            SortBy::Path => self.items.sort_by(|a, b| {
                if reverse {
                    b.display.cmp(&a.display)
                } else {
                    a.display.cmp(&b.display)
                }
            }),
        }
    }

    pub fn adjust_scroll(&mut self) {
        let visible = self.view_indexes().len();
        if self.cursor >= visible {
            self.cursor = visible.saturating_sub(1);
        }
        let height = self.list_height.max(1);
        if self.cursor >= self.scroll + height {
            self.scroll = self.cursor + 1 - height;
        }
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        }
    }

    pub fn toggle_delete_mark(&mut self) {
        let view = self.view_indexes();
        let Some(&idx) = view.get(self.cursor) else {
            return;
        };
        let item = &mut self.items[idx];
        if item.marked_archive {
            item.marked_archive = false;
            self.marked_archive_size -= item.size;
        }
        item.marked_delete = !item.marked_delete;
        if item.marked_delete {
            self.marked_delete_size += item.size;
        } else {
            self.marked_delete_size -= item.size;
        }
    }

    pub fn toggle_archive_mark(&mut self) {
        let view = self.view_indexes();
        let Some(&idx) = view.get(self.cursor) else {
            return;
        };
        let item = &mut self.items[idx];
        if item.marked_delete {
            item.marked_delete = false;
            self.marked_delete_size -= item.size;
        }
        item.marked_archive = !item.marked_archive;
        if item.marked_archive {
            self.marked_archive_size += item.size;
        } else {
            self.marked_archive_size -= item.size;
        }
    }

    pub fn mark_all_delete(&mut self) {
        for idx in self.view_indexes() {
            let item = &mut self.items[idx];
            if !item.marked_delete {
                item.marked_delete = true;
                self.marked_delete_size += item.size;
            }
        }
    }

    pub fn mark_all_archive(&mut self) {
        for idx in self.view_indexes() {
            let item = &mut self.items[idx];
            if item.marked_delete {
                item.marked_delete = false;
                self.marked_delete_size -= item.size;
            }
            if !item.marked_archive {
                item.marked_archive = true;
                self.marked_archive_size += item.size;
            }
        }
    }

    /// Tri-state invert over the visible rows: archive mark clears, delete
    /// mark clears, unmarked becomes a delete mark.
    pub fn invert_marks(&mut self) {
        for idx in self.view_indexes() {
            let item = &mut self.items[idx];
            if item.marked_archive {
                item.marked_archive = false;
                self.marked_archive_size -= item.size;
            } else if item.marked_delete {
                item.marked_delete = false;
                self.marked_delete_size -= item.size;
            } else {
                item.marked_delete = true;
                self.marked_delete_size += item.size;
            }
        }
    }

    pub fn marked_delete_count(&self) -> usize {
        self.items.iter().filter(|i| i.marked_delete).count()
    }

    pub fn marked_archive_count(&self) -> usize {
        self.items.iter().filter(|i| i.marked_archive).count()
    }

    fn marked_targets(&self, archive: bool) -> Vec<Target> {
        self.items
            .iter()
            .filter(|i| if archive { i.marked_archive } else { i.marked_delete })
            .map(|i| Target {
                path: i.path.clone(),
                size: i.size,
            })
            .collect()
    }

    // ---- operations ----------------------------------------------------

    /// Cancel whatever is running. Safe to call at any time.
    pub fn cancel_running(&mut self) {
        self.scan_cancel.cancel();
        if let Some(cancel) = &self.op_cancel {
            cancel.cancel();
        }
    }

    pub fn start_deletion(&mut self) {
        let targets = self.marked_targets(false);
        self.op_total = targets.len();
        self.op_completed = 0;
        self.op_last_path.clear();
        self.op_failures.clear();
        self.op_freed = 0;
        self.status = Status::Deleting;

        let cancel = CancelToken::new();
        self.op_cancel = Some(cancel.clone());
        let tx = self.msg_tx.clone();
        let workers = self.opts.effective_workers();
        let dry_run = self.dry_run;
        thread::spawn(move || {
            let (progress_tx, progress_rx) = bounded::<Progress>(64);
            let bridge = {
                let tx = tx.clone();
                thread::spawn(move || {
                    for p in progress_rx.iter() {
                        if tx.send(Msg::DeleteProgress(p)).is_err() {
                            return;
                        }
                    }
                })
            };
            let summary = delete_targets(&targets, workers, Some(progress_tx), dry_run, &cancel);
            let _ = bridge.join();
            let _ = tx.send(Msg::DeleteDone(summary));
        });
    }

    pub fn start_archival(&mut self) {
        let targets = self.marked_targets(true);
        self.op_total = targets.len();
        self.op_completed = 0;
        self.op_last_path.clear();
        self.op_last_dest.clear();
        self.op_written = 0;
        self.op_failures.clear();
        self.status = Status::Archiving;

        let cancel = CancelToken::new();
        self.op_cancel = Some(cancel.clone());
        let tx = self.msg_tx.clone();
        let opts = ArchiveOptions {
            out_dir: None,
            workers: self.opts.effective_workers(),
            delete_after: self.delete_after,
        };
        thread::spawn(move || {
            let (progress_tx, progress_rx) = bounded::<ArchiveProgress>(64);
            let bridge = {
                let tx = tx.clone();
                thread::spawn(move || {
                    for p in progress_rx.iter() {
                        if tx.send(Msg::ArchiveProgress(p)).is_err() {
                            return;
                        }
                    }
                })
            };
            let summary = compress_targets(&targets, &opts, Some(progress_tx), &cancel);
            let _ = bridge.join();
            let _ = tx.send(Msg::ArchiveDone(summary));
        });
    }
}
