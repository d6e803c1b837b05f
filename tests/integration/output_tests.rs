use std::fs;

use tempfile::tempdir;
use treedupe::duplicates::{directory_line, DuplicateFinder, FinderConfig, Fingerprinter};
use treedupe::error::ExitCode;
use treedupe::output::{report_groups, CsvOutput, JsonOutput, TextOutput, TreeDump};
use treedupe::scanner::{HashAlgorithm, ScanOptions, Tree};

#[test]
fn test_directory_content_is_its_listing() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b"), "bee").unwrap();
    fs::write(dir.path().join("a"), "ay").unwrap();

    let mut tree = Tree::new(ScanOptions::default());
    let root = tree.scan(dir.path()).unwrap();
    let fingerprinter = Fingerprinter::new(FinderConfig::default());

    let mut expected = Vec::new();
    for &child in tree.children(root) {
        let hash = fingerprinter.hash(&tree, child).unwrap();
        expected.extend(directory_line(&hash, tree.name(child)));
    }
    let mut listing = Vec::new();
    fingerprinter
        .content(&tree, root)
        .unwrap()
        .write_to(&mut listing)
        .unwrap();
    assert_eq!(listing, expected);

    let text = String::from_utf8(listing).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" a"));
    assert!(lines[1].ends_with(" b"));
    assert_eq!(lines[0].find(" file").unwrap(), 64);
    assert_eq!(lines[0].len(), 80 + 1 + 1);

    let digest = fingerprinter
        .content(&tree, root)
        .unwrap()
        .digest(HashAlgorithm::Blake3)
        .unwrap();
    assert_eq!(digest, fingerprinter.hash(&tree, root).unwrap().digest);
}

#[test]
fn test_reports_share_order_and_limit() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("big1"), vec![0u8; 4096]).unwrap();
    fs::write(dir.path().join("big2"), vec![0u8; 4096]).unwrap();
    fs::write(dir.path().join("tiny1"), "t").unwrap();
    fs::write(dir.path().join("tiny2"), "t").unwrap();

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    let all = report_groups(&result.tree, &result.registry, None);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].duplicated_bytes, 4096);

    let json = JsonOutput::new(&all, &result.summary, ExitCode::Success)
        .to_json()
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["duplicates"][0]["duplicated_bytes"], 4096);
    assert_eq!(parsed["duplicates"][1]["count"], 2);
    assert_eq!(parsed["summary"]["duplicate_groups"], 2);
    assert_eq!(parsed["summary"]["reclaimable_space"], 4097);

    let limited = report_groups(&result.tree, &result.registry, Some(1));
    let csv = CsvOutput::new(&limited).to_string().unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("big1"));
    assert!(!csv.contains("tiny1"));

    let mut text = Vec::new();
    TextOutput::new(&limited, &result.summary)
        .write_to(&mut text)
        .unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.starts_with("1. ["));
    assert!(text.contains("showing 1 of 2 duplicate groups"));
}

#[test]
fn test_tree_dump_of_scanned_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/leaf"), "").unwrap();

    let mut tree = Tree::new(ScanOptions::default());
    let root = tree.scan(dir.path()).unwrap();
    let mut out = Vec::new();
    TreeDump::new(&tree).write_to(&mut out, root).unwrap();
    let text = String::from_utf8(out).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("╷ [dir 1] "));
    assert_eq!(lines[1], "╰─┐ [dir 1] sub");
    assert!(lines[2].starts_with("  ╰─╴ [file "));
    assert!(lines[2].ends_with("] leaf"));
}
