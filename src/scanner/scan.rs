//! The discovery-and-measurement pipeline.
//!
//! One walker thread produces candidates, a bounded pool of measurement
//! workers consumes them. Batch mode waits for everything; streaming mode
//! hands each result over an unbuffered channel as soon as it is measured,
//! so a slow consumer throttles the scan instead of growing memory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use serde::ser::Serializer;
use serde::Serialize;

use super::error::{MeasureError, ScanError};
use super::measure::dir_size;
use super::options::ScanOptions;
use super::walker::TreeWalker;
use crate::cancel::CancelToken;

/// A measured target directory. Produced exactly once per candidate.
#[derive(Debug, Clone, Serialize)]
pub struct ResultItem {
    #[serde(rename = "Path")]
    pub path: PathBuf,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "Err", serialize_with = "serialize_error")]
    pub error: Option<MeasureError>,
}

fn serialize_error<S: Serializer>(err: &Option<MeasureError>, s: S) -> Result<S::Ok, S::Error> {
    match err {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

/// Everything a batch scan produces. Partial results survive traversal
/// errors, which are aggregated in `error`.
#[derive(Debug)]
pub struct ScanOutcome {
    pub results: Vec<ResultItem>,
    pub total_size: u64,
    pub error: Option<ScanError>,
}

/// Walk `root`, measure every matched directory and wait for all of them.
///
/// `total_size` only counts items that measured cleanly; items with a
/// measurement error carry their partial size individually.
pub fn scan(root: &Path, opts: &ScanOptions, cancel: &CancelToken) -> ScanOutcome {
    let walker = TreeWalker::new(root, opts, cancel.clone());
    let (candidates, walk_errors) = walker.collect();

    let accum = Arc::new(Mutex::new((Vec::with_capacity(candidates.len()), 0u64)));
    let (jobs_tx, jobs_rx) = bounded::<PathBuf>(0);

    let workers: Vec<_> = (0..opts.effective_workers())
        .map(|_| {
            let jobs = jobs_rx.clone();
            let accum = Arc::clone(&accum);
            let cancel = cancel.clone();
            let follow = opts.follow_symlinks;
            thread::spawn(move || {
                for path in jobs.iter() {
                    let (size, error) = dir_size(&path, follow, &cancel);
                    let mut guard = accum.lock().unwrap();
                    if error.is_none() {
                        guard.1 += size;
                    }
                    guard.0.push(ResultItem { path, size, error });
                }
            })
        })
        .collect();
    drop(jobs_rx);

    for path in candidates {
        if cancel.is_cancelled() {
            break;
        }
        if jobs_tx.send(path).is_err() {
            break;
        }
    }
    drop(jobs_tx);
    for worker in workers {
        let _ = worker.join();
    }

    let (results, total_size) = match Arc::try_unwrap(accum) {
        Ok(mutex) => mutex.into_inner().unwrap(),
        Err(_) => (Vec::new(), 0),
    };
    ScanOutcome {
        results,
        total_size,
        error: ScanError::combine(walk_errors),
    }
}

/// Walk and measure concurrently, delivering each result as it completes.
///
/// Arrival order is completion order, not discovery order. The result
/// channel closes once every worker has finished; exactly one aggregated
/// traversal error (or `None`) follows on the second channel.
pub fn scan_stream(
    root: &Path,
    opts: &ScanOptions,
    cancel: &CancelToken,
) -> (Receiver<ResultItem>, Receiver<Option<ScanError>>) {
    let (out_tx, out_rx) = bounded::<ResultItem>(0);
    let (err_tx, err_rx) = bounded::<Option<ScanError>>(1);

    let root = root.to_path_buf();
    let opts = opts.clone();
    let cancel = cancel.clone();
    thread::spawn(move || {
        let (jobs_tx, jobs_rx) = bounded::<PathBuf>(0);

        let workers: Vec<_> = (0..opts.effective_workers())
            .map(|_| {
                let jobs = jobs_rx.clone();
                let out = out_tx.clone();
                let cancel = cancel.clone();
                let follow = opts.follow_symlinks;
                thread::spawn(move || {
                    for path in jobs.iter() {
                        let (size, error) = dir_size(&path, follow, &cancel);
                        if cancel.is_cancelled() {
                            break;
                        }
                        if out.send(ResultItem { path, size, error }).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(jobs_rx);
        drop(out_tx);

        let walker = TreeWalker::new(&root, &opts, cancel.clone());
        let walk_errors = walker.stream(jobs_tx);
        for worker in workers {
            let _ = worker.join();
        }
        // Result channel is closed by now (all worker clones dropped);
        // deliver the terminal error signal.
        let _ = err_tx.send(ScanError::combine(walk_errors));
    });

    (out_rx, err_rx)
}
