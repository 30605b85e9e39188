//! Archiver module - serialize target directories into .tar.gz archives.
//!
//! Each archive is rooted under a single top-level folder named after the
//! source directory, so extraction reproduces a directory of that name.
//! Targets fan out across a bounded pool; each archive has exactly one
//! writer. Symlinks inside a source are skipped for portability.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Sender};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tar::Builder;

use crate::cancel::CancelToken;
use crate::deleter::{Failure, CANCELLED};
use crate::targets::Target;

/// Configuration for one archival run.
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Where archives are written; defaults to each target's parent.
    pub out_dir: Option<PathBuf>,
    /// Worker threads; 0 behaves as 1.
    pub workers: usize,
    /// Remove the source directory after its archive is flushed and synced.
    pub delete_after: bool,
}

/// Progress for one in-flight or finished target. `bytes_written` is the
/// cumulative uncompressed payload of the current archive. Best-effort
/// delivery; only the summary is authoritative.
#[derive(Debug, Clone)]
pub struct ArchiveProgress {
    pub completed: usize,
    pub total: usize,
    pub path: PathBuf,
    pub dest: PathBuf,
    pub bytes_written: u64,
    pub error: Option<String>,
}

/// A successfully written archive. `size` is its final on-disk size.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSuccess {
    #[serde(rename = "Path")]
    pub path: PathBuf,
    #[serde(rename = "Dest")]
    pub dest: PathBuf,
    #[serde(rename = "Size")]
    pub size: u64,
}

/// Terminal result of one archival run. A delete-after failure adds an
/// extra failure entry without downgrading the archive's success.
#[derive(Debug, Default, Serialize)]
pub struct ArchiveSummary {
    #[serde(rename = "Successes")]
    pub successes: Vec<ArchiveSuccess>,
    #[serde(rename = "Failures")]
    pub failures: Vec<Failure>,
    #[serde(rename = "Written")]
    pub written: u64,
}

/// Archive every target. Every submitted target yields exactly one primary
/// outcome; cancellation stops dispatch and records the undispatched
/// remainder as failures while in-flight archives finish.
pub fn compress_targets(
    targets: &[Target],
    opts: &ArchiveOptions,
    progress: Option<Sender<ArchiveProgress>>,
    cancel: &CancelToken,
) -> ArchiveSummary {
    let total = targets.len();
    let state = Arc::new(Mutex::new(ArchiveState {
        summary: ArchiveSummary::default(),
        completed: 0,
    }));
    let (jobs_tx, jobs_rx) = bounded::<Target>(0);

    let handles: Vec<_> = (0..opts.workers.max(1))
        .map(|_| {
            let jobs = jobs_rx.clone();
            let state = Arc::clone(&state);
            let progress = progress.clone();
            let cancel = cancel.clone();
            let opts = opts.clone();
            thread::spawn(move || {
                for target in jobs.iter() {
                    archive_one(&target, &opts, &state, progress.as_ref(), total, &cancel);
                }
            })
        })
        .collect();
    drop(jobs_rx);

    for target in targets {
        if cancel.is_cancelled() {
            let mut guard = state.lock().unwrap();
            guard.fail(
                target.path.clone(),
                PathBuf::new(),
                CANCELLED.to_string(),
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
        Err(_) => ArchiveSummary::default(),
    }
}

fn archive_one(
    target: &Target,
    opts: &ArchiveOptions,
    state: &Mutex<ArchiveState>,
    progress: Option<&Sender<ArchiveProgress>>,
    total: usize,
    cancel: &CancelToken,
) {
    let src = &target.path;
    let fail = |message: String, dest: PathBuf| {
        let mut guard = state.lock().unwrap();
        guard.fail(src.clone(), dest, message, total, progress);
    };

    if cancel.is_cancelled() {
        fail(CANCELLED.to_string(), PathBuf::new());
        return;
    }

    // The source must exist and be a directory.
    let meta = match fs::metadata(src) {
        Ok(m) => m,
        Err(e) => {
            fail(e.to_string(), PathBuf::new());
            return;
        }
    };
    if !meta.is_dir() {
        fail(format!("not a directory: {}", src.display()), PathBuf::new());
        return;
    }

    let base = match src.file_name().and_then(|n| n.to_str()) {
        Some(b) => b.to_string(),
        None => {
            fail(format!("invalid source name: {}", src.display()), PathBuf::new());
            return;
        }
    };
    let dest_dir = match &opts.out_dir {
        Some(dir) => dir.clone(),
        None => src.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
    };
    if let Err(e) = fs::create_dir_all(&dest_dir) {
        fail(e.to_string(), PathBuf::new());
        return;
    }
    let (dest, file) = match claim_dest(&dest_dir, &base) {
        Ok(claimed) => claimed,
        Err(e) => {
            fail(e.to_string(), PathBuf::new());
            return;
        }
    };

    let completed_snapshot = state.lock().unwrap().completed;
    let mut on_bytes = |written: u64| {
        if let Some(tx) = progress {
            let _ = tx.try_send(ArchiveProgress {
                completed: completed_snapshot,
                total,
                path: src.clone(),
                dest: dest.clone(),
                bytes_written: written,
                error: None,
            });
        }
    };

    match write_archive(src, &base, file, cancel, &mut on_bytes) {
        Ok(size) => {
            // Archive is flushed and synced; the source may now go.
            let cleanup_err = if opts.delete_after {
                fs::remove_dir_all(src).err()
            } else {
                None
            };
            let mut guard = state.lock().unwrap();
            if let Some(e) = cleanup_err {
                guard.summary.failures.push(Failure {
                    path: src.clone(),
                    error: format!("delete-after failed: {}", e),
                });
            }
            guard.succeed(src.clone(), dest, size, total, progress);
        }
        Err(e) => {
            // Never leave a partial archive behind.
            let _ = fs::remove_file(&dest);
            fail(e.to_string(), dest);
        }
    }
}

/// Atomically claim an unused destination path, appending `-1`, `-2`, … to
/// the basename when the plain name is taken. Creating with `create_new`
/// means two workers can never claim the same name.
fn claim_dest(dir: &Path, base: &str) -> io::Result<(PathBuf, File)> {
    let plain = dir.join(format!("{}.tar.gz", base));
    match File::create_new(&plain) {
        Ok(file) => return Ok((plain, file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e),
    }
    for n in 1..10_000u32 {
        let candidate = dir.join(format!("{}-{}.tar.gz", base, n));
        match File::create_new(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free archive name for {} in {}", base, dir.display()),
    ))
}

/// Write the gzip-compressed tar of `src` rooted under `base/`. Entries are
/// visited in sorted order so the same tree always produces the same
/// archive. Returns the final on-disk size after flush and sync.
fn write_archive(
    src: &Path,
    base: &str,
    file: File,
    cancel: &CancelToken,
    on_bytes: &mut dyn FnMut(u64),
) -> io::Result<u64> {
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);
    let prefix = Path::new(base);
    builder.append_dir(prefix, src)?;

    let mut written = 0u64;
    add_entries(&mut builder, src, prefix, cancel, &mut written, on_bytes)?;

    let encoder = builder.into_inner()?;
    let file = encoder.finish()?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

fn add_entries(
    builder: &mut Builder<GzEncoder<File>>,
    dir: &Path,
    archive_dir: &Path,
    cancel: &CancelToken,
    written: &mut u64,
    on_bytes: &mut dyn FnMut(u64),
) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        if cancel.is_cancelled() {
            return Err(io::Error::other(CANCELLED));
        }
        let file_type = entry.file_type()?;
        // Symlinks are neither followed nor stored.
        if file_type.is_symlink() {
            continue;
        }
        let path = entry.path();
        let archive_path = archive_dir.join(entry.file_name());
        if file_type.is_dir() {
            builder.append_dir(&archive_path, &path)?;
            add_entries(builder, &path, &archive_path, cancel, written, on_bytes)?;
        } else {
            builder.append_path_with_name(&path, &archive_path)?;
            *written += entry.metadata()?.len();
            on_bytes(*written);
        }
    }
    Ok(())
}

struct ArchiveState {
    summary: ArchiveSummary,
    completed: usize,
}

impl ArchiveState {
    fn succeed(
        &mut self,
        path: PathBuf,
        dest: PathBuf,
        size: u64,
        total: usize,
        progress: Option<&Sender<ArchiveProgress>>,
    ) {
        self.summary.written += size;
        self.summary.successes.push(ArchiveSuccess {
            path: path.clone(),
            dest: dest.clone(),
            size,
        });
        self.completed += 1;
        if let Some(tx) = progress {
            let _ = tx.try_send(ArchiveProgress {
                completed: self.completed,
                total,
                path,
                dest,
                bytes_written: size,
                error: None,
            });
        }
    }

    fn fail(
        &mut self,
        path: PathBuf,
        dest: PathBuf,
        message: String,
        total: usize,
        progress: Option<&Sender<ArchiveProgress>>,
    ) {
        self.summary.failures.push(Failure {
            path: path.clone(),
            error: message.clone(),
        });
        self.completed += 1;
        if let Some(tx) = progress {
            let _ = tx.try_send(ArchiveProgress {
                completed: self.completed,
                total,
                path,
                dest,
                bytes_written: 0,
                error: Some(message),
            });
        }
    }
}
