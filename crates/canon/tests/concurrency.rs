//! Integration tests for concurrent ingestion.
//!
//! Ingestions of the same file serialize on its lock and receive distinct,
//! gap-free version numbers; different files proceed independently.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use canon::{Canon, CanonConfig};

const THREADS: u32 = 8;

fn open_shared() -> (tempfile::TempDir, Arc<Canon>) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let canon = Canon::open(CanonConfig::for_workspace(dir.path())).expect("should open store");
    (dir, Arc::new(canon))
}

#[test]
fn same_file_versions_are_distinct_and_gap_free() {
    let (_dir, canon) = open_shared();

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let canon = Arc::clone(&canon);
            thread::spawn(move || {
                canon
                    .ingest_source(
                        Path::new("shared.py"),
                        &format!("def f():\n    return {i}\n"),
                    )
                    .expect("concurrent ingest should succeed")
                    .version_number
            })
        })
        .collect();

    let mut numbers: Vec<u32> = handles
        .into_iter()
        .map(|h| h.join().expect("thread should not panic"))
        .collect();
    numbers.sort_unstable();

    assert_eq!(numbers, (1..=THREADS).collect::<Vec<_>>());

    let versions = canon
        .list_versions(Path::new("shared.py"))
        .expect("versions");
    assert_eq!(versions.len(), THREADS as usize);
    for pair in versions.windows(2) {
        assert_eq!(pair[1].version_number, pair[0].version_number + 1);
        assert_eq!(pair[1].previous_version_id, Some(pair[0].id));
    }
    assert!(canon.verify(Path::new("shared.py")).expect("verify").matched);
}

#[test]
fn different_files_ingest_in_parallel() {
    let (_dir, canon) = open_shared();

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let canon = Arc::clone(&canon);
            thread::spawn(move || {
                let path = PathBuf::from(format!("pkg/mod_{i}.py"));
                canon
                    .ingest_source(&path, &format!("VALUE = {i}\n"))
                    .expect("ingest should succeed")
            })
        })
        .collect();

    for handle in handles {
        let report = handle.join().expect("thread should not panic");
        assert_eq!(report.version_number, 1);
        assert_eq!(report.component_count, 1);
    }

    let files = canon.list_files().expect("files");
    assert_eq!(files.len(), THREADS as usize);
    let stats = canon.get_stats().expect("stats");
    assert_eq!(stats.version_count, THREADS as usize);
}
