use clap::Parser;
use dupfind::cli::Cli;
use dupfind::config::{Config, ConfigError, ENV_PREFIX};
use dupfind::scanner::PerceptualAlgorithm;
use figment::providers::{Env, Serialized};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.algorithm, PerceptualAlgorithm::Phash);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("DUPFIND_WORKER_THREADS", "16");
    std::env::set_var("DUPFIND_ALGORITHM", "dhash");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .unwrap();

    assert_eq!(config.worker_threads, 16);
    assert_eq!(config.algorithm, PerceptualAlgorithm::Dhash);

    // Clean up
    std::env::remove_var("DUPFIND_WORKER_THREADS");
    std::env::remove_var("DUPFIND_ALGORITHM");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let toml_content = r#"
excluded_names = ["node_modules", "target"]
ignore_patterns = ["*.tmp"]
revalidate = true
use_trash = true
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.excluded_names, vec!["node_modules", "target"]);
    assert_eq!(config.ignore_patterns, vec!["*.tmp"]);
    assert!(config.revalidate);
    assert!(config.use_trash);
}

#[test]
fn test_config_unknown_algorithm_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "algorithm = \"blockhash\"\n").unwrap();

    let result = Config::load(Some(&config_path));

    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

#[test]
fn test_config_missing_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let result = Config::load(Some(&temp_dir.path().join("nope.toml")));

    match result {
        Err(ConfigError::NotFound(path)) => assert!(path.ends_with("nope.toml")),
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_cli_overrides_config_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "use_trash = false\nrevalidate = false\n").unwrap();

    let cli = Cli::try_parse_from([
        "dupfind",
        "--dir-a",
        "/photos",
        "--trash",
        "--revalidate",
        "--threads",
        "3",
        "--config",
        config_path.to_str().unwrap(),
    ])
    .unwrap();
    let config = Config::load(cli.config.as_deref())
        .unwrap()
        .with_cli_overrides(&cli);

    assert!(config.use_trash);
    assert!(config.revalidate);
    assert_eq!(config.worker_threads, 3);
    assert_eq!(config.effective_workers(), 3);
}
