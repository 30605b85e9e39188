// Tests for the archive pipeline: round-trips, naming, delete-after,
// failure shapes, and cancellation.

use std::fs::{self, File};
use std::path::Path;

use flate2::read::GzDecoder;
use nodesweep::archiver::{compress_targets, ArchiveOptions, ArchiveSummary};
use nodesweep::cancel::CancelToken;
use nodesweep::deleter::CANCELLED;
use nodesweep::targets::Target;
use tar::Archive;

fn target(path: &Path, size: u64) -> Target {
    Target {
        path: path.to_path_buf(),
        size,
    }
}

fn opts(out_dir: &Path, delete_after: bool) -> ArchiveOptions {
    ArchiveOptions {
        out_dir: Some(out_dir.to_path_buf()),
        workers: 1,
        delete_after,
    }
}

fn compress_one(src: &Path, out_dir: &Path, delete_after: bool) -> ArchiveSummary {
    compress_targets(
        &[target(src, 0)],
        &opts(out_dir, delete_after),
        None,
        &CancelToken::new(),
    )
}

fn extract(archive: &Path, into: &Path) {
    let file = File::open(archive).unwrap();
    let mut ar = Archive::new(GzDecoder::new(file));
    ar.unpack(into).unwrap();
}

#[test]
fn round_trip_reproduces_the_source_under_its_own_name() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("node_modules");
    fs::create_dir_all(src.join("pkg/sub")).unwrap();
    fs::write(src.join("a.txt"), b"hello archive").unwrap();
    fs::write(src.join("pkg/b.bin"), vec![7u8; 2048]).unwrap();
    fs::write(src.join("pkg/sub/c.txt"), b"deep").unwrap();
    let out = dir.path().join("out");

    let summary = compress_one(&src, &out, false);
    assert_eq!(summary.successes.len(), 1, "failures: {:?}", summary.failures);
    let success = &summary.successes[0];
    assert_eq!(success.dest, out.join("node_modules.tar.gz"));
    assert_eq!(success.size, fs::metadata(&success.dest).unwrap().len());
    assert_eq!(summary.written, success.size);
    assert!(src.exists(), "source must survive without delete-after");

    let extracted = dir.path().join("extracted");
    extract(&success.dest, &extracted);
    let top = extracted.join("node_modules");
    assert!(top.is_dir(), "extraction must produce a folder named after the source");
    assert_eq!(fs::read(top.join("a.txt")).unwrap(), b"hello archive");
    assert_eq!(fs::read(top.join("pkg/b.bin")).unwrap(), vec![7u8; 2048]);
    assert_eq!(fs::read(top.join("pkg/sub/c.txt")).unwrap(), b"deep");
}

#[test]
fn existing_archives_get_numeric_suffixes() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("node_modules");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("f.txt"), b"x").unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("node_modules.tar.gz"), b"occupied").unwrap();
    fs::write(out.join("node_modules-1.tar.gz"), b"also occupied").unwrap();

    let summary = compress_one(&src, &out, false);
    assert_eq!(summary.successes.len(), 1);
    assert_eq!(
        summary.successes[0].dest,
        out.join("node_modules-2.tar.gz")
    );
    // the occupied names were left alone
    assert_eq!(fs::read(out.join("node_modules.tar.gz")).unwrap(), b"occupied");
}

#[test]
fn delete_after_removes_the_source_once_the_archive_is_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("node_modules");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("f.bin"), vec![1u8; 4096]).unwrap();
    let out = dir.path().join("out");

    let summary = compress_one(&src, &out, true);
    assert_eq!(summary.successes.len(), 1);
    assert!(summary.failures.is_empty());
    assert!(!src.exists(), "source should be removed after a verified archive");
    assert!(summary.successes[0].dest.exists());
}

#[test]
fn missing_and_non_directory_sources_fail_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-here");
    let file = dir.path().join("plain.txt");
    fs::write(&file, b"not a dir").unwrap();
    let out = dir.path().join("out");

    let summary = compress_targets(
        &[target(&missing, 0), target(&file, 0)],
        &opts(&out, false),
        None,
        &CancelToken::new(),
    );

    assert_eq!(summary.successes.len(), 0);
    assert_eq!(summary.failures.len(), 2);
    let errors: Vec<&str> = summary.failures.iter().map(|f| f.error.as_str()).collect();
    assert!(errors.iter().any(|e| e.contains("not a directory")));
    // no stray archives
    assert!(fs::read_dir(&out)
        .map(|entries| entries.count() == 0)
        .unwrap_or(true));
}

#[cfg(unix)]
#[test]
fn symlinks_inside_the_source_are_not_stored() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("node_modules");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("real.txt"), b"kept").unwrap();
    std::os::unix::fs::symlink(src.join("real.txt"), src.join("link.txt")).unwrap();
    let out = dir.path().join("out");

    let summary = compress_one(&src, &out, false);
    assert_eq!(summary.successes.len(), 1);

    let extracted = dir.path().join("extracted");
    extract(&summary.successes[0].dest, &extracted);
    let top = extracted.join("node_modules");
    assert!(top.join("real.txt").exists());
    assert!(
        !top.join("link.txt").exists(),
        "symlinked entries must not appear in the archive"
    );
}

#[test]
fn cancellation_fails_all_pending_targets() {
    let dir = tempfile::tempdir().unwrap();
    let mut targets = Vec::new();
    for i in 0..3 {
        let src = dir.path().join(format!("p{}/node_modules", i));
        fs::create_dir_all(&src).unwrap();
        targets.push(target(&src, 0));
    }
    let out = dir.path().join("out");

    let cancel = CancelToken::new();
    cancel.cancel();
    let summary = compress_targets(&targets, &opts(&out, false), None, &cancel);

    assert_eq!(summary.successes.len(), 0);
    assert_eq!(summary.failures.len(), 3);
    for failure in &summary.failures {
        assert_eq!(failure.error, CANCELLED);
    }
    assert!(!out.exists(), "no archives may be written after cancellation");
}

#[test]
fn archive_summary_serializes_with_stable_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("node_modules");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("f.txt"), b"payload").unwrap();
    let out = dir.path().join("out");

    let summary = compress_one(&src, &out, false);
    let value = serde_json::to_value(&summary).unwrap();

    assert!(value["Written"].as_u64().unwrap() > 0);
    assert_eq!(value["Successes"][0]["Path"], src.to_str().unwrap());
    assert_eq!(
        value["Successes"][0]["Dest"],
        out.join("node_modules.tar.gz").to_str().unwrap()
    );
    assert!(value["Successes"][0]["Size"].as_u64().unwrap() > 0);
    assert!(value["Failures"].as_array().unwrap().is_empty());
}

#[test]
fn deterministic_archives_for_identical_trees() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["one", "two"] {
        let src = dir.path().join(name).join("node_modules");
        fs::create_dir_all(src.join("pkg")).unwrap();
        fs::write(src.join("a.txt"), b"same bytes").unwrap();
        fs::write(src.join("pkg/b.txt"), b"more bytes").unwrap();
    }
    let out_one = dir.path().join("out1");
    let out_two = dir.path().join("out2");

    let first = compress_one(&dir.path().join("one/node_modules"), &out_one, false);
    let second = compress_one(&dir.path().join("two/node_modules"), &out_two, false);
    assert_eq!(first.successes.len(), 1);
    assert_eq!(second.successes.len(), 1);

    // same entry order and same compression settings; only file metadata
    // (mtimes) may differ, so compare the entry listing instead of bytes
    let list = |dest: &Path| -> Vec<String> {
        let file = File::open(dest).unwrap();
        let mut ar = Archive::new(GzDecoder::new(file));
        ar.entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect()
    };
    assert_eq!(
        list(&first.successes[0].dest),
        list(&second.successes[0].dest)
    );
}
