use dupfind::cache::FileRecord;
use dupfind::duplicates::{group, Similarity};
use dupfind::scanner::{
    CorpusError, CorpusScanner, ScanError, ScanStats, WalkerConfig, CACHE_FILE_NAME,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn scan(root: &Path) -> (Vec<FileRecord>, ScanStats) {
    CorpusScanner::new(root).with_workers(2).hash_files().unwrap()
}

fn write(root: &Path, name: &str, content: &[u8]) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (records, stats) = scan(dir.path());

    assert!(records.is_empty());
    assert_eq!(stats.universe, 0);
    assert_eq!(stats.computed, 0);
    assert!(stats.persisted);
    assert!(dir.path().join(CACHE_FILE_NAME).exists());
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"content a");
    write(dir.path(), "b.txt", b"content b");
    write(dir.path(), "c.txt", b"content c");

    let (records, stats) = scan(dir.path());
    let (groups, grouping) = group(records, Similarity::Exact);

    assert_eq!(stats.universe, 3);
    assert_eq!(stats.computed, 3);
    assert!(groups.is_empty());
    assert_eq!(grouping.singletons, 3);
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"duplicate");
    write(dir.path(), "b.txt", b"duplicate");
    write(dir.path(), "c.txt", b"unique");

    let (records, _) = scan(dir.path());
    let (groups, grouping) = group(records, Similarity::Exact);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(grouping.duplicate_groups, 1);
    assert_eq!(grouping.grouped_files, 2);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"same");
    write(dir.path(), "sub/b.txt", b"same");
    write(dir.path(), "sub/deeper/c.txt", b"same");

    let (records, _) = scan(dir.path());
    let (groups, _) = group(records, Similarity::Exact);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
}

#[test]
fn test_records_are_absolute_and_sorted() {
    let dir = tempdir().unwrap();
    write(dir.path(), "z.txt", b"z");
    write(dir.path(), "a.txt", b"a");
    write(dir.path(), "m/b.txt", b"b");

    let (records, _) = scan(dir.path());
    let paths: Vec<_> = records.iter().map(|r| r.path.clone()).collect();
    let mut sorted = paths.clone();
    sorted.sort();

    assert_eq!(paths, sorted);
    assert!(paths.iter().all(|p| p.is_absolute()));
    let root = fs::canonicalize(dir.path()).unwrap();
    assert!(paths.iter().all(|p| p.starts_with(&root)));
}

#[test]
fn test_reserved_and_configured_names_are_skipped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "keep.txt", b"data");
    write(dir.path(), "$RECYCLE.BIN/trashed.txt", b"data");
    write(dir.path(), "node_modules/pkg/index.js", b"data");

    let config = WalkerConfig::default().with_excluded_names(["node_modules"]);
    let (records, stats) = CorpusScanner::new(dir.path())
        .with_walker_config(config)
        .hash_files()
        .unwrap();

    assert_eq!(stats.universe, 1);
    assert!(records[0].path.ends_with("keep.txt"));
}

#[test]
fn test_ignore_patterns_are_skipped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "keep.txt", b"data");
    write(dir.path(), "scratch.tmp", b"data");
    write(dir.path(), "build/out.txt", b"data");

    let config = WalkerConfig::default()
        .with_ignore_patterns(vec!["*.tmp".to_string(), "build/".to_string()]);
    let (records, _) = CorpusScanner::new(dir.path())
        .with_walker_config(config)
        .hash_files()
        .unwrap();

    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("keep.txt"));
}

#[cfg(unix)]
#[test]
fn test_hidden_directories_are_pruned() {
    let dir = tempdir().unwrap();
    write(dir.path(), "visible.txt", b"data");
    write(dir.path(), ".git/objects/blob", b"data");

    let (records, _) = scan(dir.path());

    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("visible.txt"));
}

#[test]
fn test_dot_named_root_is_scanned() {
    let dir = tempdir().unwrap();
    let root = dir.path().join(".photos");
    write(&root, "a.txt", b"same");
    write(&root, "b.txt", b"same");

    let (records, stats) = scan(&root);
    assert_eq!(stats.universe, 2);
    assert_eq!(group(records, Similarity::Exact).0.len(), 1);

    // The cache survives a second scan instead of being reconciled away.
    let (records, stats) = scan(&root);
    assert_eq!(records.len(), 2);
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(stats.dropped_stale, 0);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_candidates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "target.txt", b"data");
    std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt"))
        .unwrap();

    let (records, _) = scan(dir.path());

    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("target.txt"));
}

#[test]
fn test_scan_non_existent_path() {
    let result = CorpusScanner::new(Path::new("/non/existent/path/12345")).hash_files();

    match result {
        Err(CorpusError::Scan(ScanError::NotFound(path))) => {
            assert!(path.to_string_lossy().contains("non/existent/path/12345"));
        }
        other => panic!("Expected NotFound error, got {:?}", other),
    }
}

#[test]
fn test_scan_file_instead_of_directory() {
    let dir = tempdir().unwrap();
    write(dir.path(), "file.txt", b"data");

    let result = CorpusScanner::new(&dir.path().join("file.txt")).hash_files();

    assert!(matches!(
        result,
        Err(CorpusError::Scan(ScanError::NotADirectory(_)))
    ));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(dir.path(), "open.txt", b"data");
    write(dir.path(), "locked.txt", b"data");
    let locked = dir.path().join("locked.txt");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits.
    if File::open(&locked).is_ok() {
        return;
    }

    let (records, stats) = scan(dir.path());

    assert_eq!(records.len(), 1);
    assert_eq!(stats.failed, 1);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}
