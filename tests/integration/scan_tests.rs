use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tempfile::tempdir;
use treedupe::duplicates::{DuplicateFinder, FinderConfig, FinderError, Fingerprinter, ScanResult};
use treedupe::scanner::{HashAlgorithm, NodeKind, ScanOptions, Tree};

fn find(root: &Path) -> ScanResult {
    DuplicateFinder::with_defaults()
        .find_duplicates(&[root.to_path_buf()])
        .unwrap()
}

fn group_paths(result: &ScanResult) -> Vec<Vec<PathBuf>> {
    result
        .registry
        .groups_by_descending_waste(&result.tree)
        .into_iter()
        .map(|(_, members)| members.iter().map(|&id| result.tree.path(id)).collect())
        .collect()
}

fn hash_of(path: &Path) -> treedupe::scanner::ContentHash {
    let mut tree = Tree::new(ScanOptions::default());
    let id = tree.scan(path).unwrap();
    Fingerprinter::new(FinderConfig::default())
        .hash(&tree, id)
        .unwrap()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let result = find(dir.path());

    assert_eq!(result.summary.total_entries, 1);
    assert_eq!(result.summary.total_size, 0);
    assert_eq!(result.summary.duplicate_groups, 0);
    assert!(group_paths(&result).is_empty());
}

#[test]
fn test_scan_round_trip_two_of_three() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "x").unwrap();
    fs::write(dir.path().join("b"), "x").unwrap();
    fs::write(dir.path().join("c"), "y").unwrap();

    let result = find(dir.path());

    assert!(result.summary.pruned);
    assert_eq!(result.summary.candidates, 3);
    assert_eq!(
        group_paths(&result),
        vec![vec![dir.path().join("a"), dir.path().join("b")]]
    );
    assert_eq!(result.summary.duplicate_groups, 1);
    assert_eq!(result.summary.reclaimable_space, 1);
}

#[test]
fn test_scan_ten_megabyte_files() {
    let dir = tempdir().unwrap();
    let ten_mb = 10 * 1024 * 1024;
    fs::write(dir.path().join("one"), vec![b'a'; ten_mb]).unwrap();
    fs::write(dir.path().join("two"), vec![b'a'; ten_mb]).unwrap();
    let mut other = vec![b'a'; ten_mb];
    other[ten_mb - 1] = b'b';
    fs::write(dir.path().join("three"), other).unwrap();

    let result = find(dir.path());

    assert_eq!(result.summary.candidates, 3);
    assert_eq!(result.summary.leaves.files, 3);
    assert_eq!(result.summary.leaves.bytes, 3 * ten_mb as u64);
    assert_eq!(
        group_paths(&result),
        vec![vec![dir.path().join("one"), dir.path().join("two")]]
    );
    assert_eq!(result.summary.reclaimable_space, ten_mb as u64);
}

#[test]
fn test_scan_duplicate_directories_rank_first() {
    let dir = tempdir().unwrap();
    for copy in ["d1", "d2"] {
        let d = dir.path().join(copy);
        fs::create_dir(&d).unwrap();
        fs::write(d.join("f"), "hello").unwrap();
        fs::write(d.join("g"), "w").unwrap();
    }

    let result = find(dir.path());
    let groups = result.registry.groups_by_descending_waste(&result.tree);

    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].0.kind, NodeKind::Directory);
    assert_eq!(
        result.registry.duplicated_bytes(&groups[0].0, &result.tree),
        6
    );
    let paths = group_paths(&result);
    assert_eq!(paths[0], vec![dir.path().join("d1"), dir.path().join("d2")]);
    assert_eq!(
        paths[1],
        vec![dir.path().join("d1/f"), dir.path().join("d2/f")]
    );
    assert_eq!(result.summary.reclaimable_space, 6 + 5 + 1);
}

#[test]
fn test_directory_hash_follows_names_and_contents() {
    let dir = tempdir().unwrap();
    let make = |name: &str, files: &[(&str, &str)]| {
        let d = dir.path().join(name);
        fs::create_dir(&d).unwrap();
        for (file, content) in files {
            fs::write(d.join(file), content).unwrap();
        }
        d
    };
    let base = make("base", &[("a", "1"), ("b", "2")]);
    let same = make("same", &[("b", "2"), ("a", "1")]);
    let renamed = make("renamed", &[("a", "1"), ("c", "2")]);
    let changed = make("changed", &[("a", "1"), ("b", "3")]);
    let extra = make("extra", &[("a", "1"), ("b", "2"), ("c", "")]);

    assert_eq!(hash_of(&base), hash_of(&same));
    assert_ne!(hash_of(&base), hash_of(&renamed));
    assert_ne!(hash_of(&base), hash_of(&changed));
    assert_ne!(hash_of(&base), hash_of(&extra));
}

#[test]
fn test_file_hash_equal_bytes_and_single_byte_difference() {
    let dir = tempdir().unwrap();
    let data: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let mut flipped = data.clone();
    flipped[25_000] ^= 1;
    fs::write(dir.path().join("p"), &data).unwrap();
    fs::write(dir.path().join("q"), &data).unwrap();
    fs::write(dir.path().join("r"), &flipped).unwrap();

    assert_eq!(hash_of(&dir.path().join("p")), hash_of(&dir.path().join("q")));
    assert_ne!(hash_of(&dir.path().join("p")), hash_of(&dir.path().join("r")));
}

#[test]
fn test_file_and_directory_never_share_a_hash() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("empty_dir")).unwrap();
    fs::write(dir.path().join("empty_file"), "").unwrap();

    let d = hash_of(&dir.path().join("empty_dir"));
    let f = hash_of(&dir.path().join("empty_file"));
    assert_eq!(d.digest, f.digest);
    assert_ne!(d, f);
}

#[test]
fn test_rebuild_is_deterministic() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("x/y")).unwrap();
    fs::write(dir.path().join("x/y/z"), "deep").unwrap();
    fs::write(dir.path().join("x/w"), "shallow").unwrap();

    let mut tree = Tree::new(ScanOptions::default());
    let root = tree.scan(dir.path()).unwrap();
    let x = tree.children(root)[0];
    let fingerprinter = Fingerprinter::new(FinderConfig::default());
    let before = fingerprinter.hash(&tree, x).unwrap();

    let rebuilt = tree.rebuild(x).unwrap();
    assert_ne!(rebuilt, x);
    assert_eq!(tree.children(root)[0], rebuilt);
    assert_eq!(fingerprinter.hash(&tree, rebuilt).unwrap(), before);
    assert_eq!(fingerprinter.hash(&tree, root).unwrap(), hash_of(dir.path()));
}

#[test]
fn test_empty_files_and_directories_are_grouped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("e1"), "").unwrap();
    fs::write(dir.path().join("e2"), "").unwrap();

    let result = find(dir.path());
    let groups = result.registry.groups_by_descending_waste(&result.tree);
    assert_eq!(groups.len(), 1);
    assert_eq!(result.registry.duplicated_bytes(&groups[0].0, &result.tree), 0);
}

#[cfg(unix)]
#[test]
fn test_symlinks_compare_by_target() {
    let dir = tempdir().unwrap();
    std::os::unix::fs::symlink("target", dir.path().join("l1")).unwrap();
    std::os::unix::fs::symlink("target", dir.path().join("l2")).unwrap();
    std::os::unix::fs::symlink("elsewhere", dir.path().join("l3")).unwrap();

    let result = find(dir.path());
    let groups = result.registry.groups_by_descending_waste(&result.tree);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0.kind, NodeKind::Symlink);
    assert_eq!(group_paths(&result)[0].len(), 2);
}

#[test]
fn test_missing_root_fails_the_scan() {
    let dir = tempdir().unwrap();
    let err = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().join("missing")])
        .unwrap_err();
    assert!(matches!(err, FinderError::Scan(ref e) if e.is_not_found()));
}

#[test]
fn test_shutdown_flag_interrupts() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "same").unwrap();
    fs::write(dir.path().join("b"), "same").unwrap();

    let config = FinderConfig::default().with_shutdown_flag(Arc::new(AtomicBool::new(true)));
    let err = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap_err();
    assert!(matches!(err, FinderError::Interrupted));
}

#[test]
fn test_parallel_and_sha256_find_the_same_groups() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("f{i:02}")), format!("{}", i % 5)).unwrap();
    }

    let baseline = group_paths(&find(dir.path()));
    assert_eq!(baseline.len(), 5);

    for config in [
        FinderConfig::default().with_io_threads(4),
        FinderConfig::default().with_algorithm(HashAlgorithm::Sha256),
    ] {
        let result = DuplicateFinder::new(config)
            .find_duplicates(&[dir.path().to_path_buf()])
            .unwrap();
        assert_eq!(group_paths(&result), baseline);
    }
}
