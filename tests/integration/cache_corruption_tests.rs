use dupfind::cache::{CacheError, FingerprintStore};
use dupfind::scanner::{CorpusScanner, ScanStats, CACHE_FILE_NAME};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn scan(root: &Path) -> ScanStats {
    CorpusScanner::new(root).hash_files().unwrap().1
}

fn cache_file(root: &Path) -> PathBuf {
    root.join(CACHE_FILE_NAME)
}

fn populated_dir() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    fs::write(dir.path().join("b.txt"), "beta").unwrap();
    scan(dir.path());
    dir
}

#[test]
fn test_garbage_cache_is_rebuilt() {
    let dir = populated_dir();
    fs::write(cache_file(dir.path()), "not json at all").unwrap();

    let stats = scan(dir.path());

    assert_eq!(stats.computed, 2);
    assert_eq!(stats.cache_hits, 0);
    // The rebuilt cache is valid again.
    let store = FingerprintStore::open(&fs::canonicalize(dir.path()).unwrap());
    assert!(store.try_load().unwrap().is_some());
}

#[test]
fn test_truncated_cache_is_rebuilt() {
    let dir = populated_dir();
    let raw = fs::read_to_string(cache_file(dir.path())).unwrap();
    fs::write(cache_file(dir.path()), &raw[..raw.len() / 2]).unwrap();

    let stats = scan(dir.path());

    assert_eq!(stats.computed, 2);
}

#[test]
fn test_tampered_cache_fails_checksum() {
    let dir = populated_dir();
    let raw = fs::read_to_string(cache_file(dir.path())).unwrap();
    let tampered = raw.replacen("\"size\": 5", "\"size\": 6", 1);
    assert_ne!(raw, tampered);
    fs::write(cache_file(dir.path()), tampered).unwrap();

    let store = FingerprintStore::open(&fs::canonicalize(dir.path()).unwrap());
    assert!(matches!(store.try_load(), Err(CacheError::ChecksumMismatch)));

    let stats = scan(dir.path());
    assert_eq!(stats.computed, 2);
}

#[test]
fn test_other_version_is_rebuilt() {
    let dir = populated_dir();
    let raw = fs::read_to_string(cache_file(dir.path())).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    value["version"] = serde_json::json!(99);
    fs::write(cache_file(dir.path()), value.to_string()).unwrap();

    let store = FingerprintStore::open(&fs::canonicalize(dir.path()).unwrap());
    assert!(matches!(
        store.try_load(),
        Err(CacheError::VersionMismatch { found: 99, .. })
    ));

    let stats = scan(dir.path());
    assert_eq!(stats.computed, 2);
}

#[test]
fn test_cache_copied_from_another_root_is_rebuilt() {
    let original = populated_dir();
    let copy = tempdir().unwrap();
    fs::write(copy.path().join("a.txt"), "alpha").unwrap();
    fs::copy(cache_file(original.path()), cache_file(copy.path())).unwrap();

    let stats = scan(copy.path());

    assert_eq!(stats.computed, 1);
    assert_eq!(stats.cache_hits, 0);
}

#[test]
fn test_corrupt_image_is_isolated() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    image::RgbImage::from_pixel(16, 16, image::Rgb([200, 10, 10]))
        .save(dir.path().join("red.png"))
        .unwrap();

    let (records, stats) = CorpusScanner::new(dir.path()).hash_files().unwrap();

    assert_eq!(stats.universe, 3);
    assert_eq!(stats.failed, 1);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| !r.path.ends_with("broken.png")));

    // The failed file is retried on the next scan; the rest comes from cache.
    let stats = scan(dir.path());
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(stats.failed, 1);
}

#[cfg(unix)]
#[test]
fn test_read_only_root_still_returns_records() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    fs::write(dir.path().join("b.txt"), "alpha").unwrap();
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();

    let marker = dir.path().join("write-check");
    let writable = fs::write(&marker, "x").is_ok();
    let result = CorpusScanner::new(dir.path()).hash_files();
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

    // Root ignores permission bits.
    if writable {
        return;
    }

    let (records, stats) = result.unwrap();
    assert_eq!(records.len(), 2);
    assert!(!stats.persisted);
}
