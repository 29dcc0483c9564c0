use dupfind::cache::{FingerprintStore, CACHE_VERSION};
use dupfind::scanner::{CorpusScanner, ScanStats, CACHE_FILE_NAME, CACHE_TEMP_FILE_NAME};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn scan(root: &Path) -> ScanStats {
    CorpusScanner::new(root).with_workers(2).hash_files().unwrap().1
}

fn store(root: &Path) -> FingerprintStore {
    FingerprintStore::open(&fs::canonicalize(root).unwrap())
}

fn scan_revalidating(root: &Path) -> ScanStats {
    CorpusScanner::new(root)
        .with_revalidate(true)
        .hash_files()
        .unwrap()
        .1
}

#[test]
fn test_second_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    fs::write(dir.path().join("b.txt"), "beta").unwrap();

    let first = scan(dir.path());
    let cache_after_first = store(dir.path()).load();

    let second = scan(dir.path());
    let cache_after_second = store(dir.path()).load();

    assert_eq!(first.computed, 2);
    assert_eq!(second.computed, 0);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(
        cache_after_first.records(),
        cache_after_second.records()
    );
}

#[test]
fn test_added_file_is_the_only_computation() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    scan(dir.path());

    fs::write(dir.path().join("b.txt"), "beta").unwrap();
    let stats = scan(dir.path());

    assert_eq!(stats.computed, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(store(dir.path()).load().len(), 2);
}

#[test]
fn test_removed_file_leaves_the_cache() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    fs::write(dir.path().join("b.txt"), "beta").unwrap();
    scan(dir.path());

    fs::remove_file(dir.path().join("b.txt")).unwrap();
    let stats = scan(dir.path());

    assert_eq!(stats.computed, 0);
    assert_eq!(stats.dropped_stale, 1);
    let cache = store(dir.path()).load();
    assert_eq!(cache.len(), 1);
    let root = fs::canonicalize(dir.path()).unwrap();
    assert!(cache.get(&root.join("b.txt")).is_none());
}

#[test]
fn test_changed_file_is_kept_without_revalidate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "alpha").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    scan(dir.path());

    fs::write(&path, "changed content").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(2_000_000, 0)).unwrap();
    let stats = scan(dir.path());

    assert_eq!(stats.computed, 0);
    assert_eq!(stats.invalidated, 0);
}

#[test]
fn test_revalidate_recomputes_changed_files() {
    let dir = tempdir().unwrap();
    let changed = dir.path().join("a.txt");
    fs::write(&changed, "alpha").unwrap();
    fs::write(dir.path().join("b.txt"), "beta").unwrap();
    set_file_mtime(&changed, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    scan(dir.path());

    fs::write(&changed, "changed content").unwrap();
    set_file_mtime(&changed, FileTime::from_unix_time(2_000_000, 0)).unwrap();
    let stats = scan_revalidating(dir.path());

    assert_eq!(stats.invalidated, 1);
    assert_eq!(stats.computed, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[test]
fn test_mtime_only_change_is_revalidated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "alpha").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    scan(dir.path());

    set_file_mtime(&path, FileTime::from_unix_time(1_500_000, 0)).unwrap();
    let stats = scan_revalidating(dir.path());

    assert_eq!(stats.invalidated, 1);
    assert_eq!(stats.computed, 1);
}

#[test]
fn test_cache_file_format() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    scan(dir.path());

    let raw = fs::read_to_string(dir.path().join(CACHE_FILE_NAME)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(value["version"], CACHE_VERSION);
    assert_eq!(value["checksum"].as_str().unwrap().len(), 64);
    let entries = value["cache"]["entries"].as_object().unwrap();
    assert_eq!(entries.len(), 1);
    let entry = entries.values().next().unwrap();
    assert_eq!(entry["fingerprint"]["kind"], "exact");
    assert_eq!(entry["fingerprint"]["digest"].as_str().unwrap().len(), 64);
    assert_eq!(entry["size"], 5);

    assert!(!dir.path().join(CACHE_TEMP_FILE_NAME).exists());
}

#[test]
fn test_cache_file_is_not_a_candidate() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    scan(dir.path());
    fs::write(dir.path().join(CACHE_TEMP_FILE_NAME), "leftover").unwrap();

    let stats = scan(dir.path());

    assert_eq!(stats.universe, 1);
}

#[test]
fn test_each_root_has_its_own_cache() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fs::write(a.path().join("x.txt"), "x").unwrap();
    fs::write(b.path().join("y.txt"), "y").unwrap();

    scan(a.path());
    scan(b.path());

    assert_eq!(store(a.path()).load().len(), 1);
    assert_eq!(store(b.path()).load().len(), 1);
}
