//! Deleter module - concurrent removal of selected target directories.
//!
//! A bounded worker pool consumes the target list. Every submitted target
//! resolves to exactly one outcome; progress events are best-effort and only
//! the terminal summary is authoritative.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Sender};
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::targets::Target;

/// One finished target. Delivery is best-effort: a slow consumer may miss
/// events, never block a worker.
#[derive(Debug, Clone)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub path: PathBuf,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    #[serde(rename = "Path")]
    pub path: PathBuf,
    #[serde(rename = "Err")]
    pub error: String,
}

/// Terminal result of one deletion run.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    #[serde(rename = "Successes")]
    pub successes: Vec<Target>,
    #[serde(rename = "Failures")]
    pub failures: Vec<Failure>,
    #[serde(rename = "Freed")]
    pub freed: u64,
}

pub const CANCELLED: &str = "operation cancelled";

/// Delete all targets with a pool of `workers` threads.
///
/// Dry-run records synthetic successes without touching the filesystem.
/// Cancellation stops dispatching new targets (the undispatched remainder is
/// recorded as cancellation failures) while in-flight removals finish and
/// report normally.
pub fn delete_targets(
    targets: &[Target],
    workers: usize,
    progress: Option<Sender<Progress>>,
    dry_run: bool,
    cancel: &CancelToken,
) -> Summary {
    let total = targets.len();
    let workers = workers.max(1);
    let state = Arc::new(Mutex::new(DeleteState {
        summary: Summary::default(),
        completed: 0,
    }));
    let (jobs_tx, jobs_rx) = bounded::<Target>(0);

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let jobs = jobs_rx.clone();
            let state = Arc::clone(&state);
            let progress = progress.clone();
            let cancel = cancel.clone();
            thread::spawn(move || {
                for target in jobs.iter() {
                    let error = if cancel.is_cancelled() {
                        Some(CANCELLED.to_string())
                    } else if dry_run {
                        None
                    } else {
                        fs::remove_dir_all(&target.path).err().map(|e| e.to_string())
                    };
                    let mut guard = state.lock().unwrap();
                    guard.finish(target, error, total, progress.as_ref());
                }
            })
        })
        .collect();
    drop(jobs_rx);

    for target in targets {
        if cancel.is_cancelled() {
            // Everything not yet dispatched still gets an outcome.
            let mut guard = state.lock().unwrap();
            guard.finish(
                target.clone(),
                Some(CANCELLED.to_string()),
                total,
                progress.as_ref(),
            );
            continue;
        }
        if jobs_tx.send(target.clone()).is_err() {
            break;
        }
    }
    drop(jobs_tx);
    for handle in handles {
        let _ = handle.join();
    }

    match Arc::try_unwrap(state) {
        Ok(mutex) => mutex.into_inner().unwrap().summary,
        Err(_) => Summary::default(),
    }
}

struct DeleteState {
    summary: Summary,
    completed: usize,
}

impl DeleteState {
    /// Record one outcome and emit its progress event without ever blocking.
    fn finish(
        &mut self,
        target: Target,
        error: Option<String>,
        total: usize,
        progress: Option<&Sender<Progress>>,
    ) {
        let path = target.path.clone();
        match &error {
            Some(message) => self.summary.failures.push(Failure {
                path: target.path,
                error: message.clone(),
            }),
            None => {
                self.summary.freed += target.size;
                self.summary.successes.push(target);
            }
        }
        self.completed += 1;
        if let Some(tx) = progress {
            let event = Progress {
                completed: self.completed,
                total,
                path,
                error,
            };
            // A full or abandoned channel drops the event.
            let _ = tx.try_send(event);
        }
    }
}
