#![cfg(unix)]

use std::fs;
use std::path::Path;

use tempfile::tempdir;
use treedupe::duplicates::{DuplicateFinder, FinderConfig, FinderError, Fingerprinter};
use treedupe::scanner::{ContentHash, FilterError, ScanOptions, Tree};

fn hash_with(config: FinderConfig, path: &Path) -> ContentHash {
    let mut tree = Tree::new(ScanOptions::default());
    let id = tree.scan(path).unwrap();
    Fingerprinter::new(config).hash(&tree, id).unwrap()
}

fn content_with(config: FinderConfig, path: &Path) -> Vec<u8> {
    let mut tree = Tree::new(ScanOptions::default());
    let id = tree.scan(path).unwrap();
    let stream = Fingerprinter::new(config).content(&tree, id).unwrap();
    let mut out = Vec::new();
    stream.write_to(&mut out).unwrap();
    out
}

#[test]
fn test_passthrough_filter_keeps_hashes() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    fs::write(&file, "some text\nwith lines\n").unwrap();
    fs::write(dir.path().join("other.txt"), "more").unwrap();

    let filtered = FinderConfig::default().with_filter("txt", "cat");
    assert_eq!(
        hash_with(filtered.clone(), &file),
        hash_with(FinderConfig::default(), &file)
    );
    assert_eq!(
        hash_with(filtered, dir.path()),
        hash_with(FinderConfig::default(), dir.path())
    );
}

#[test]
fn test_filter_makes_files_equal() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.log"), "run 1 ok\n").unwrap();
    fs::write(dir.path().join("b.log"), "run 2 ok\n").unwrap();
    fs::write(dir.path().join("c.txt"), "run 3 ok\n").unwrap();

    let plain = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(plain.summary.duplicate_groups, 0);

    let config = FinderConfig::default().with_filter("log", "tr -d 0-9");
    let filtered = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert!(!filtered.summary.pruned);
    let groups = filtered
        .registry
        .groups_by_descending_waste(&filtered.tree);
    assert_eq!(groups.len(), 1);
    let paths: Vec<_> = groups[0].1.iter().map(|&id| filtered.tree.path(id)).collect();
    assert_eq!(paths, vec![dir.path().join("a.log"), dir.path().join("b.log")]);
}

#[test]
fn test_filters_run_in_order() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("word.txt");
    fs::write(&file, "ab").unwrap();

    let upper_then_swap = FinderConfig::default()
        .with_filter("txt", "tr a-z A-Z")
        .with_filter("txt", "tr A B");
    assert_eq!(content_with(upper_then_swap, &file), b"BB");

    let swap_then_upper = FinderConfig::default()
        .with_filter("txt", "tr A B")
        .with_filter("txt", "tr a-z A-Z");
    assert_eq!(content_with(swap_then_upper, &file), b"AB");
}

#[test]
fn test_filter_for_files_without_extension() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("README");
    fs::write(&file, "hello").unwrap();

    let config = FinderConfig::default().with_filter("", "tr a-z A-Z");
    assert_eq!(content_with(config, &file), b"HELLO");
}

#[test]
fn test_missing_filter_program_aborts() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), "1").unwrap();
    fs::write(dir.path().join("b.bin"), "1").unwrap();

    let config = FinderConfig::default().with_filter("bin", "treedupe-no-such-filter-program");
    let err = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap_err();
    assert!(matches!(
        err,
        FinderError::Filter(FilterError::NotRunnable { .. })
    ));
    assert!(!err.is_recoverable());
}

#[test]
fn test_failing_filter_is_counted_but_output_used() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.dat"), "same").unwrap();
    fs::write(dir.path().join("b.dat"), "same").unwrap();

    let config = FinderConfig::default().with_filter("dat", "cat; exit 3");
    let result = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(result.summary.leaves.filter_failures, 2);
    assert_eq!(result.summary.duplicate_groups, 1);
}
