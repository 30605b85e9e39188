// Tests for the scan pipeline: discovery, measurement, depth and exclusion
// boundaries, streaming, and cancellation.

use std::fs;
use std::path::{Path, PathBuf};

use nodesweep::cancel::CancelToken;
use nodesweep::scanner::{scan, scan_stream, ScanOptions};

fn write_file_of_size(path: &Path, size: usize) {
    fs::write(path, vec![0u8; size]).unwrap();
}

/// a/node_modules {x.bin 1KiB, y.bin 2KiB}, b/node_modules {z.bin 3KiB},
/// c/ empty.
fn standard_tree(root: &Path) {
    let a = root.join("a/node_modules");
    fs::create_dir_all(&a).unwrap();
    write_file_of_size(&a.join("x.bin"), 1024);
    write_file_of_size(&a.join("y.bin"), 2048);

    let b = root.join("b/node_modules");
    fs::create_dir_all(&b).unwrap();
    write_file_of_size(&b.join("z.bin"), 3072);

    fs::create_dir_all(root.join("c")).unwrap();
}

fn opts() -> ScanOptions {
    ScanOptions {
        workers: 2,
        ..ScanOptions::default()
    }
}

#[test]
fn finds_and_sizes_all_targets() {
    let dir = tempfile::tempdir().unwrap();
    standard_tree(dir.path());

    let outcome = scan(dir.path(), &opts(), &CancelToken::new());
    assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.total_size, 1024 + 2048 + 3072);
    for item in &outcome.results {
        assert!(item.error.is_none());
    }
}

#[test]
fn nested_targets_report_the_outer_match_only() {
    let dir = tempfile::tempdir().unwrap();
    let outer = dir.path().join("app/node_modules");
    let inner = outer.join("some-pkg/node_modules");
    fs::create_dir_all(&inner).unwrap();
    write_file_of_size(&outer.join("index.js"), 100);
    write_file_of_size(&inner.join("lib.js"), 200);

    let outcome = scan(dir.path(), &opts(), &CancelToken::new());
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].path, outer);
    // the nested copy still counts toward the outer directory's size
    assert_eq!(outcome.results[0].size, 300);
}

#[test]
fn depth_boundary_both_ways() {
    let dir = tempfile::tempdir().unwrap();
    // target sits at depth 3 relative to the root
    let nm = dir.path().join("level1/level2/node_modules");
    fs::create_dir_all(&nm).unwrap();
    write_file_of_size(&nm.join("a.bin"), 10);

    let shallow = ScanOptions {
        max_depth: Some(2),
        ..opts()
    };
    let outcome = scan(dir.path(), &shallow, &CancelToken::new());
    assert_eq!(outcome.results.len(), 0, "max_depth below the target must miss it");

    let exact = ScanOptions {
        max_depth: Some(3),
        ..opts()
    };
    let outcome = scan(dir.path(), &exact, &CancelToken::new());
    assert_eq!(outcome.results.len(), 1, "max_depth at the target must find it");
}

#[test]
fn a_root_named_like_the_target_is_the_sole_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("node_modules");
    fs::create_dir_all(root.join("nested/node_modules")).unwrap();
    write_file_of_size(&root.join("f.bin"), 64);

    let outcome = scan(&root, &opts(), &CancelToken::new());
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].path, root);
}

#[test]
fn basename_exclusion_skips_every_target() {
    let dir = tempfile::tempdir().unwrap();
    standard_tree(dir.path());

    let excluded = ScanOptions {
        excludes: vec!["node_modules".to_string()],
        ..opts()
    };
    let outcome = scan(dir.path(), &excluded, &CancelToken::new());
    assert_eq!(outcome.results.len(), 0);
    assert_eq!(outcome.total_size, 0);
}

#[test]
fn full_path_exclusion_skips_that_path_only() {
    let dir = tempfile::tempdir().unwrap();
    standard_tree(dir.path());

    let excluded = ScanOptions {
        excludes: vec![format!("{}/a/node_modules", dir.path().display())],
        ..opts()
    };
    let outcome = scan(dir.path(), &excluded, &CancelToken::new());
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].path, dir.path().join("b/node_modules"));
    assert_eq!(outcome.total_size, 3072);
}

#[test]
fn wildcard_exclusion_matches_within_one_segment() {
    let dir = tempfile::tempdir().unwrap();
    standard_tree(dir.path());

    // `<root>/a/*`: the star covers the single basename segment
    let excluded = ScanOptions {
        excludes: vec![format!("{}/a/*", dir.path().display())],
        ..opts()
    };
    let outcome = scan(dir.path(), &excluded, &CancelToken::new());
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.total_size, 3072);
}

#[test]
fn wildcard_star_never_spans_multiple_segments() {
    let dir = tempfile::tempdir().unwrap();
    standard_tree(dir.path());

    // `*/a/*` has three literal segments; an absolute path underneath a
    // temp root has more, so nothing is excluded.
    let excluded = ScanOptions {
        excludes: vec!["*/a/*".to_string()],
        ..opts()
    };
    let outcome = scan(dir.path(), &excluded, &CancelToken::new());
    assert_eq!(outcome.results.len(), 2);
}

#[test]
fn segment_globs_exclude_relative_paths_by_shape() {
    let dir = tempfile::tempdir().unwrap();
    standard_tree(&dir.path().join("tree"));

    // `*/a/*` pairs with a relative root: `tree/a/node_modules` has exactly
    // the pattern's three segments
    let prev = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let excluded = ScanOptions {
        excludes: vec!["*/a/*".to_string()],
        ..opts()
    };
    let outcome = scan(Path::new("tree"), &excluded, &CancelToken::new());
    std::env::set_current_dir(prev).unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.total_size, 3072);
}

#[test]
fn streaming_delivers_the_same_set_as_batch() {
    let dir = tempfile::tempdir().unwrap();
    standard_tree(dir.path());

    let (items_rx, err_rx) = scan_stream(dir.path(), &opts(), &CancelToken::new());
    let mut streamed: Vec<(PathBuf, u64)> =
        items_rx.iter().map(|item| (item.path, item.size)).collect();
    let err = err_rx.recv().expect("terminal error signal must arrive");
    assert!(err.is_none());

    let mut batch: Vec<(PathBuf, u64)> = scan(dir.path(), &opts(), &CancelToken::new())
        .results
        .into_iter()
        .map(|item| (item.path, item.size))
        .collect();

    streamed.sort();
    batch.sort();
    assert_eq!(streamed, batch);
}

#[test]
fn cancelling_a_streaming_scan_stops_the_stream_promptly() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..50 {
        let nm = dir.path().join(format!("proj{:02}/node_modules", i));
        fs::create_dir_all(&nm).unwrap();
        write_file_of_size(&nm.join("f.bin"), 16);
    }

    let cancel = CancelToken::new();
    let single = ScanOptions {
        workers: 1,
        ..ScanOptions::default()
    };
    let (items_rx, err_rx) = scan_stream(dir.path(), &single, &cancel);

    let first = items_rx.recv();
    assert!(first.is_ok(), "at least one result should stream out");
    cancel.cancel();

    // The stream must close without delivering the full set.
    let rest = items_rx.iter().count();
    assert!(rest < 10, "scan kept going after cancellation ({} more items)", rest);

    // The terminal signal still arrives, leaving the channel pair well formed.
    assert!(err_rx.recv().is_ok());
}

#[test]
fn symlinked_directories_are_not_traversed() {
    #[cfg(unix)]
    {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("elsewhere/node_modules");
        fs::create_dir_all(&real).unwrap();
        write_file_of_size(&real.join("f.bin"), 512);
        let scanned = dir.path().join("scanned");
        fs::create_dir_all(&scanned).unwrap();
        std::os::unix::fs::symlink(dir.path().join("elsewhere"), scanned.join("link")).unwrap();

        let outcome = scan(&scanned, &opts(), &CancelToken::new());
        assert_eq!(outcome.results.len(), 0);
    }
}

#[test]
fn unreadable_entries_surface_as_a_combined_error_with_partial_results() {
    let dir = tempfile::tempdir().unwrap();
    standard_tree(dir.path());

    // scan a root that does not exist alongside a real one to confirm the
    // error shape; the missing root is the simplest traversal failure
    let missing = dir.path().join("not-here");
    let outcome = scan(&missing, &opts(), &CancelToken::new());
    assert_eq!(outcome.results.len(), 0);
    let err = outcome.error.expect("missing root must produce a scan error");
    assert!(err.to_string().contains("walk error at"));
}
