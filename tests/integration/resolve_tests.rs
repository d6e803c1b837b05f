use std::fs;
use std::path::Path;

use tempfile::tempdir;
use treedupe::actions::{DeleteConfig, DeleteResult};
use treedupe::duplicates::{
    DuplicateFinder, FinderConfig, Fingerprinter, Registry, ReverifyEvent, ScanResult,
};
use treedupe::interactive::{
    ResolutionObserver, ResolveError, Resolver, ScriptedChooser, SilentObserver, State,
};
use treedupe::scanner::{ContentHash, ScanOptions, Tree};

fn find(root: &Path) -> ScanResult {
    DuplicateFinder::with_defaults()
        .find_duplicates(&[root.to_path_buf()])
        .unwrap()
}

#[derive(Default)]
struct Recorder {
    positions: Vec<(usize, usize)>,
    vanished: Vec<String>,
    changed: usize,
    deleted: usize,
}

impl ResolutionObserver for Recorder {
    fn on_group(&mut self, position: usize, total: usize, _: &ContentHash, _: usize, _: u64) {
        self.positions.push((position, total));
    }

    fn on_reverify(&mut self, event: &ReverifyEvent) {
        match event {
            ReverifyEvent::Vanished { path } => self
                .vanished
                .push(path.file_name().unwrap().to_string_lossy().into_owned()),
            ReverifyEvent::Changed { .. } => self.changed += 1,
            ReverifyEvent::Failed { .. } => {}
        }
    }

    fn on_deleted(&mut self, _: &DeleteResult) {
        self.deleted += 1;
    }
}

#[test]
fn test_delete_all_on_ten_megabyte_group() {
    let dir = tempdir().unwrap();
    let ten_mb = 10 * 1024 * 1024;
    fs::write(dir.path().join("one"), vec![7u8; ten_mb]).unwrap();
    fs::write(dir.path().join("two"), vec![7u8; ten_mb]).unwrap();
    fs::write(dir.path().join("three"), vec![8u8; ten_mb]).unwrap();

    let mut result = find(dir.path());
    let mut chooser = ScriptedChooser::new(["D"]);
    let mut recorder = Recorder::default();
    let mut resolver = Resolver::new(
        &mut result.tree,
        &mut result.fingerprinter,
        &mut result.registry,
        DeleteConfig::default(),
    );

    let state = resolver.run(&mut chooser, &mut recorder).unwrap();
    assert_eq!(state, State::Done);
    assert_eq!(resolver.stats().entries_deleted, 2);
    assert_eq!(resolver.stats().bytes_freed, 2 * ten_mb as u64);
    drop(resolver);

    assert!(!dir.path().join("one").exists());
    assert!(!dir.path().join("two").exists());
    assert!(dir.path().join("three").exists());
    assert_eq!(result.registry.duplicate_group_count(), 0);
    assert!(result
        .registry
        .groups_by_descending_waste(&result.tree)
        .is_empty());
    assert_eq!(recorder.deleted, 2);
}

#[test]
fn test_keep_one_member() {
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.path().join(name), "copy").unwrap();
    }

    let mut result = find(dir.path());
    let mut chooser = ScriptedChooser::new(["2"]);
    let mut resolver = Resolver::new(
        &mut result.tree,
        &mut result.fingerprinter,
        &mut result.registry,
        DeleteConfig::default(),
    );
    assert_eq!(
        resolver.run(&mut chooser, &mut SilentObserver).unwrap(),
        State::Done
    );

    assert!(!dir.path().join("a").exists());
    assert!(dir.path().join("b").exists());
    assert!(!dir.path().join("c").exists());

    let labels: Vec<&str> = chooser.asked[0].iter().map(|o| o.key.as_str()).collect();
    assert_eq!(labels, vec!["1", "2", "3", "D", "n", "p", "q"]);
    assert!(chooser.asked[0][1].label.contains("\"") && chooser.asked[0][1].label.ends_with("b\""));
}

#[test]
fn test_member_deleted_externally_before_review() {
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.path().join(name), "copy").unwrap();
    }

    let mut result = find(dir.path());
    fs::remove_file(dir.path().join("b")).unwrap();

    let mut chooser = ScriptedChooser::new(["q"]);
    let mut recorder = Recorder::default();
    let mut resolver = Resolver::new(
        &mut result.tree,
        &mut result.fingerprinter,
        &mut result.registry,
        DeleteConfig::default(),
    );
    assert_eq!(resolver.run(&mut chooser, &mut recorder).unwrap(), State::Quit);

    assert_eq!(recorder.vanished, vec!["b".to_string()]);
    let keys: Vec<&str> = chooser.asked[0].iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["1", "2", "D", "n", "p", "q"]);
    assert!(dir.path().join("a").exists());
    assert!(dir.path().join("c").exists());
}

#[test]
fn test_group_reduced_to_one_is_dropped_without_asking() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "pair").unwrap();
    fs::write(dir.path().join("b"), "pair").unwrap();

    let mut result = find(dir.path());
    fs::remove_file(dir.path().join("a")).unwrap();

    let mut chooser = ScriptedChooser::new(Vec::<String>::new());
    let mut recorder = Recorder::default();
    let mut resolver = Resolver::new(
        &mut result.tree,
        &mut result.fingerprinter,
        &mut result.registry,
        DeleteConfig::default(),
    );
    assert_eq!(resolver.run(&mut chooser, &mut recorder).unwrap(), State::Done);
    assert!(chooser.asked.is_empty());
    assert_eq!(recorder.vanished, vec!["a".to_string()]);
    assert!(dir.path().join("b").exists());
}

#[test]
fn test_changed_member_leaves_the_group() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "same").unwrap();
    fs::write(dir.path().join("b"), "same").unwrap();

    let mut result = find(dir.path());
    fs::write(dir.path().join("b"), "different now").unwrap();

    let mut chooser = ScriptedChooser::new(Vec::<String>::new());
    let mut recorder = Recorder::default();
    let mut resolver = Resolver::new(
        &mut result.tree,
        &mut result.fingerprinter,
        &mut result.registry,
        DeleteConfig::default(),
    );
    assert_eq!(resolver.run(&mut chooser, &mut recorder).unwrap(), State::Done);
    assert_eq!(recorder.changed, 1);
    assert!(chooser.asked.is_empty());
    assert!(dir.path().join("a").exists());
    assert!(dir.path().join("b").exists());
}

#[test]
fn test_next_and_previous_wrap_around() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("big1"), vec![1u8; 100]).unwrap();
    fs::write(dir.path().join("big2"), vec![1u8; 100]).unwrap();
    fs::write(dir.path().join("small1"), "s").unwrap();
    fs::write(dir.path().join("small2"), "s").unwrap();

    let mut result = find(dir.path());
    let mut chooser = ScriptedChooser::new(["n", "n", "p", "p", "q"]);
    let mut recorder = Recorder::default();
    let mut resolver = Resolver::new(
        &mut result.tree,
        &mut result.fingerprinter,
        &mut result.registry,
        DeleteConfig::default(),
    );
    assert_eq!(resolver.run(&mut chooser, &mut recorder).unwrap(), State::Quit);
    assert_eq!(
        recorder.positions,
        vec![(1, 2), (2, 2), (1, 2), (2, 2), (1, 2)]
    );
    assert_eq!(recorder.deleted, 0);
}

#[test]
fn test_deleting_directory_copies_retires_nested_groups() {
    let dir = tempdir().unwrap();
    for copy in ["d1", "d2"] {
        let d = dir.path().join(copy);
        fs::create_dir(&d).unwrap();
        fs::write(d.join("inner"), "nested content").unwrap();
    }

    let mut result = find(dir.path());
    let mut chooser = ScriptedChooser::new(["1"]);
    let mut recorder = Recorder::default();
    let mut resolver = Resolver::new(
        &mut result.tree,
        &mut result.fingerprinter,
        &mut result.registry,
        DeleteConfig::default(),
    );
    assert_eq!(resolver.run(&mut chooser, &mut recorder).unwrap(), State::Done);

    assert!(dir.path().join("d1/inner").exists());
    assert!(!dir.path().join("d2").exists());
    // the file inside the removed copy vanished, so its group needs no choice
    assert_eq!(chooser.asked.len(), 1);
    assert_eq!(recorder.vanished, vec!["inner".to_string()]);
    assert_eq!(recorder.deleted, 2);
}

#[test]
fn test_invalid_choice_is_an_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "dup").unwrap();
    fs::write(dir.path().join("b"), "dup").unwrap();

    let mut result = find(dir.path());
    let mut chooser = ScriptedChooser::new(["9"]);
    let mut resolver = Resolver::new(
        &mut result.tree,
        &mut result.fingerprinter,
        &mut result.registry,
        DeleteConfig::default(),
    );
    let err = resolver.run(&mut chooser, &mut SilentObserver).unwrap_err();
    assert!(matches!(err, ResolveError::InvalidChoice(ref c) if c == "9"));
    assert!(dir.path().join("a").exists());
    assert!(dir.path().join("b").exists());
}

#[test]
fn test_keep_one_never_deletes_an_entry_overlapping_the_kept_copy() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("only.txt"), "the single copy").unwrap();

    let mut tree = Tree::new(ScanOptions::default());
    let first = tree.scan(dir.path()).unwrap();
    let second = tree.scan(dir.path()).unwrap();
    let mut fingerprinter = Fingerprinter::new(FinderConfig::default());
    let hash = fingerprinter.hash(&tree, first).unwrap();
    let mut registry = Registry::new();
    registry.register(first, hash);
    registry.register(second, hash);

    let mut resolver = Resolver::new(&mut tree, &mut fingerprinter, &mut registry, DeleteConfig::default());
    let mut chooser = ScriptedChooser::new(["1"]);
    let mut recorder = Recorder::default();
    let state = resolver.run(&mut chooser, &mut recorder).unwrap();

    assert_eq!(state, State::Done);
    assert_eq!(recorder.deleted, 0);
    assert_eq!(resolver.stats().bytes_freed, 0);
    assert!(dir.path().join("only.txt").exists());
}
