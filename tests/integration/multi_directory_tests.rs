use std::fs;
use std::path::Path;

use tempfile::tempdir;
use treedupe::duplicates::DuplicateFinder;
use treedupe::scanner::NodeKind;

fn populate(root: &Path) {
    fs::create_dir_all(root.join("albums/2019")).unwrap();
    fs::write(root.join("albums/2019/track01"), vec![3u8; 2048]).unwrap();
    fs::write(root.join("albums/cover"), "jpeg bytes").unwrap();
}

#[test]
fn test_identical_roots_form_a_group() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    populate(left.path());
    populate(right.path());

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[left.path().to_path_buf(), right.path().to_path_buf()])
        .unwrap();

    assert_eq!(result.tree.roots().len(), 2);
    assert_eq!(result.summary.total_entries, 2 * 5);
    let groups = result.registry.groups_by_descending_waste(&result.tree);
    let first: Vec<_> = groups[0].1.iter().map(|&id| result.tree.path(id)).collect();
    assert_eq!(groups[0].0.kind, NodeKind::Directory);
    assert_eq!(first, vec![left.path().to_path_buf(), right.path().to_path_buf()]);
    // roots, albums, 2019, track01, cover
    assert_eq!(groups.len(), 5);
}

#[test]
fn test_file_duplicated_across_roots() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    fs::write(left.path().join("report.pdf"), "pdf body").unwrap();
    fs::write(right.path().join("copy-of-report.pdf"), "pdf body").unwrap();
    fs::write(right.path().join("unrelated"), "something else").unwrap();

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[left.path().to_path_buf(), right.path().to_path_buf()])
        .unwrap();

    let groups = result.registry.groups_by_descending_waste(&result.tree);
    assert_eq!(groups.len(), 1);
    let paths: Vec<_> = groups[0].1.iter().map(|&id| result.tree.path(id)).collect();
    assert_eq!(
        paths,
        vec![
            left.path().join("report.pdf"),
            right.path().join("copy-of-report.pdf")
        ]
    );
}

#[test]
fn test_root_inside_another_root_is_scanned_once() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/only.txt"), "the single copy of this").unwrap();

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf(), dir.path().join("sub")])
        .unwrap();

    assert_eq!(result.tree.roots().len(), 1);
    assert_eq!(result.tree.path(result.tree.roots()[0]), dir.path());
    assert_eq!(result.summary.total_entries, 3);
    assert_eq!(result.summary.duplicate_groups, 0);
    assert_eq!(result.summary.reclaimable_space, 0);
}

#[test]
fn test_outer_root_given_last_still_wins() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/only.txt"), "data").unwrap();

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().join("sub"), dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(result.tree.roots().len(), 1);
    assert_eq!(result.tree.path(result.tree.roots()[0]), dir.path());
    assert_eq!(result.summary.duplicate_groups, 0);
}

#[test]
fn test_repeated_root_is_scanned_once() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("only.txt"), "data").unwrap();
    let spelled_differently = dir.path().join(".").join("..").join(dir.path().file_name().unwrap());

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
            spelled_differently,
        ])
        .unwrap();

    assert_eq!(result.tree.roots().len(), 1);
    assert_eq!(result.summary.duplicate_groups, 0);
    assert!(result.registry.groups_by_descending_waste(&result.tree).is_empty());
}

#[test]
fn test_sibling_roots_with_shared_prefix_are_both_scanned() {
    let parent = tempdir().unwrap();
    let a = parent.path().join("photos");
    let b = parent.path().join("photos-backup");
    fs::create_dir(&a).unwrap();
    fs::create_dir(&b).unwrap();
    fs::write(a.join("img"), "pixels").unwrap();
    fs::write(b.join("img"), "pixels").unwrap();

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[a.clone(), b.clone()])
        .unwrap();

    assert_eq!(result.tree.roots().len(), 2);
    assert_eq!(result.summary.duplicate_groups, 2);
}
