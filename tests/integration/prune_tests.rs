use clap::Parser;
use dupfind::actions::{plan_prune, Mode, RemovalReason};
use dupfind::cli::Cli;
use dupfind::config::Config;
use dupfind::duplicates::Similarity;
use dupfind::error::ExitCode;
use dupfind::scanner::CorpusScanner;
use dupfind::signal::ShutdownHandler;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn run_dupfind(args: &[&str]) -> (anyhow::Result<ExitCode>, String) {
    let cli = Cli::try_parse_from(["dupfind", "-q"].iter().chain(args)).unwrap();
    let config = Config::default().with_cli_overrides(&cli);
    let mut out = Vec::new();
    let result = dupfind::run(&cli, &config, &ShutdownHandler::new(), &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn dir_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_prune_removes_files_present_in_b() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fs::write(a.path().join("x.txt"), "X").unwrap();
    fs::write(a.path().join("y.txt"), "Y").unwrap();
    fs::write(b.path().join("z.txt"), "X").unwrap();

    let (result, out) = run_dupfind(&["--dir-a", dir_arg(a.path()), "--dir-b", dir_arg(b.path())]);

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.contains("Removed 1 file."));
    assert!(!a.path().join("x.txt").exists());
    assert!(a.path().join("y.txt").exists());
    assert!(b.path().join("z.txt").exists());
}

#[test]
fn test_prune_never_touches_b() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fs::write(a.path().join("x.txt"), "X").unwrap();
    fs::write(b.path().join("one.txt"), "X").unwrap();
    fs::write(b.path().join("two.txt"), "X").unwrap();

    let (result, out) = run_dupfind(&["--dir-a", dir_arg(a.path()), "--dir-b", dir_arg(b.path())]);

    assert!(result.is_ok());
    assert!(out.contains("Removed 1 file."));
    // Duplicates inside B are not B's concern in prune mode.
    assert!(b.path().join("one.txt").exists());
    assert!(b.path().join("two.txt").exists());
}

#[test]
fn test_prune_removes_every_copy_in_a() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fs::write(a.path().join("x1.txt"), "X").unwrap();
    fs::write(a.path().join("x2.txt"), "X").unwrap();
    fs::write(b.path().join("z.txt"), "X").unwrap();

    let (_, out) = run_dupfind(&["--dir-a", dir_arg(a.path()), "--dir-b", dir_arg(b.path())]);

    assert!(out.contains("Removed 2 files."));
    assert!(!a.path().join("x1.txt").exists());
    assert!(!a.path().join("x2.txt").exists());
}

#[test]
fn test_nested_comparison_root_is_left_alone() {
    let a = tempdir().unwrap();
    let b = a.path().join("archive");
    fs::create_dir(&b).unwrap();
    fs::write(a.path().join("same.txt"), "X").unwrap();
    fs::write(b.join("same.txt"), "X").unwrap();
    fs::write(b.join("copy.txt"), "X").unwrap();

    let (records_a, _) = CorpusScanner::new(a.path()).hash_files().unwrap();
    let (records_b, _) = CorpusScanner::new(&b).hash_files().unwrap();
    let actions = plan_prune(&records_a, &records_b, Similarity::Exact, Mode::DryRun);

    // Only the copy outside B goes; both files under B are B's.
    assert_eq!(actions.len(), 1);
    assert!(!actions[0].path.starts_with(fs::canonicalize(&b).unwrap()));
    assert!(actions[0].path.ends_with("same.txt"));
    assert_eq!(actions[0].reason, RemovalReason::PresentInComparison);
    assert_eq!(actions[0].peers.len(), 2);
}

#[test]
fn test_comparison_root_inside_a_is_never_modified() {
    let a = tempdir().unwrap();
    let b = a.path().join("archive");
    fs::create_dir(&b).unwrap();
    fs::write(b.join("one.txt"), "X").unwrap();
    fs::write(b.join("two.txt"), "X").unwrap();

    let (result, out) = run_dupfind(&["--dir-a", dir_arg(a.path()), "--dir-b", dir_arg(&b)]);

    assert!(result.is_ok());
    assert!(out.contains("Removed 0 files."));
    assert!(b.join("one.txt").exists());
    assert!(b.join("two.txt").exists());
}

#[test]
fn test_same_root_twice_removes_nothing() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "X").unwrap();
    fs::write(dir.path().join("b.txt"), "X").unwrap();

    let (result, out) = run_dupfind(&[
        "--dir-a",
        dir_arg(dir.path()),
        "--dir-b",
        dir_arg(dir.path()),
    ]);

    assert!(result.is_ok());
    assert!(out.contains("Removed 0 files."));
    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn test_prune_by_name() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fs::create_dir(b.path().join("2021")).unwrap();
    fs::write(a.path().join("IMG_0001.txt"), "edited").unwrap();
    fs::write(a.path().join("IMG_0002.txt"), "new").unwrap();
    fs::write(b.path().join("2021/IMG_0001.txt"), "original").unwrap();

    let (result, out) = run_dupfind(&[
        "--dir-a",
        dir_arg(a.path()),
        "--dir-b",
        dir_arg(b.path()),
        "--match",
        "name",
    ]);

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.contains("same name as"));
    assert!(out.contains("Removed 1 file."));
    assert!(!a.path().join("IMG_0001.txt").exists());
    assert!(a.path().join("IMG_0002.txt").exists());
    assert!(b.path().join("2021/IMG_0001.txt").exists());
}

#[test]
fn test_prune_dry_run_json() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fs::write(a.path().join("x.txt"), "X").unwrap();
    fs::write(b.path().join("z.txt"), "X").unwrap();

    let (result, out) = run_dupfind(&[
        "--dir-a",
        dir_arg(a.path()),
        "--dir-b",
        dir_arg(b.path()),
        "--dry-run",
        "--output",
        "json",
    ]);

    assert!(result.is_ok());
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["actions"][0]["reason"], "present_in_comparison");
    assert_eq!(value["summary"]["roots"].as_array().unwrap().len(), 2);
    assert!(value["summary"].get("duplicate_groups").is_none());
    assert_eq!(value["summary"]["match"], "content");
    assert!(a.path().join("x.txt").exists());
}
