use std::fs;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use tempfile::tempdir;
use treedupe::config::{Config, ConfigError};
use treedupe::duplicates::DuplicateFinder;
use treedupe::scanner::{ChildOrder, HashAlgorithm};

#[test]
fn test_config_file_layers_over_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
hash_algorithm = "sha256"
io_threads = 3

[filters]
flac = ["metaflac --export-tags-to=- -", "sort"]
"#,
    )
    .unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();

    assert_eq!(config.hash_algorithm, HashAlgorithm::Sha256);
    assert_eq!(config.io_threads, 3);
    assert!(!config.use_trash);
    assert_eq!(config.filters["flac"].len(), 2);
    assert_eq!(config.filters["flac"][1], "sort");
}

#[test]
fn test_environment_overrides_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "child_order = \"name\"\n").unwrap();

    std::env::set_var("TREEDUPE_CHILD_ORDER", "native");
    std::env::set_var("TREEDUPE_FILTERS__MD", "[\"cat\"]");
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("TREEDUPE_").split("__"))
        .extract()
        .unwrap();
    std::env::remove_var("TREEDUPE_CHILD_ORDER");
    std::env::remove_var("TREEDUPE_FILTERS__MD");

    assert_eq!(config.child_order, ChildOrder::Native);
    assert_eq!(config.filters["md"], vec!["cat".to_string()]);
}

#[test]
fn test_load_reports_missing_explicit_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    match Config::load(Some(&missing)) {
        Err(ConfigError::NotFound(path)) => assert_eq!(path, missing),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn test_printed_config_loads_back() {
    let dir = tempdir().unwrap();
    let mut config = Config {
        hash_algorithm: HashAlgorithm::Sha256,
        io_threads: 2,
        ..Config::default()
    };
    config
        .filters
        .insert("pdf".to_string(), vec!["pdftotext - -".to_string()]);

    let path = dir.path().join("printed.toml");
    fs::write(&path, config.to_toml().unwrap()).unwrap();
    let loaded: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_finder_config_drives_the_scan() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "dup").unwrap();
    fs::write(dir.path().join("b"), "dup").unwrap();

    let config = Config {
        hash_algorithm: HashAlgorithm::Sha256,
        io_threads: 2,
        ..Config::default()
    };
    let finder_config = config.finder_config();
    assert_eq!(finder_config.algorithm, HashAlgorithm::Sha256);
    assert_eq!(finder_config.io_threads, 2);

    let result = DuplicateFinder::new(finder_config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(result.summary.duplicate_groups, 1);
}
