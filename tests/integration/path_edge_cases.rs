use dupfind::cache::FingerprintStore;
use dupfind::duplicates::{group, DuplicateGroup, Similarity};
use dupfind::scanner::CorpusScanner;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn groups_of(root: &Path) -> Vec<DuplicateGroup> {
    let (records, _) = CorpusScanner::new(root).hash_files().unwrap();
    group(records, Similarity::Exact).0
}

#[test]
fn test_paths_with_quotes() {
    let dir = tempdir().unwrap();

    // Windows does not allow double quotes in filenames.
    if cfg!(not(windows)) {
        File::create(dir.path().join("file_with_\"quote\".txt"))
            .expect("Failed to create file with quotes")
            .write_all(b"content")
            .unwrap();
        fs::write(dir.path().join("duplicate.txt"), b"content").unwrap();

        let groups = groups_of(dir.path());

        assert_eq!(groups.len(), 1);
        assert!(groups[0]
            .files
            .iter()
            .any(|f| f.path.to_string_lossy().contains('"')));

        // The cache round-trips the escaped key.
        let store = FingerprintStore::open(&fs::canonicalize(dir.path()).unwrap());
        assert_eq!(store.try_load().unwrap().unwrap().len(), 2);
    }
}

#[test]
fn test_paths_with_newlines() {
    let dir = tempdir().unwrap();

    // Windows does not allow newlines in filenames.
    if cfg!(not(windows)) {
        fs::write(dir.path().join("file_with\nnewline.txt"), b"content").unwrap();
        fs::write(dir.path().join("duplicate.txt"), b"content").unwrap();

        let groups = groups_of(dir.path());

        assert_eq!(groups.len(), 1);
        assert!(groups[0]
            .files
            .iter()
            .any(|f| f.path.to_string_lossy().contains('\n')));
    }
}

#[test]
fn test_unicode_names() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("café.txt"), b"content").unwrap();
    fs::write(dir.path().join("写真.txt"), b"content").unwrap();

    let groups = groups_of(dir.path());

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);

    // Second scan reads both names back from the cache.
    let (_, stats) = CorpusScanner::new(dir.path()).hash_files().unwrap();
    assert_eq!(stats.cache_hits, 2);
}

#[cfg(unix)]
#[test]
fn test_non_utf8_names_are_rehashed_each_scan() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let name = OsStr::from_bytes(b"bad\xffname.txt");
    if fs::write(dir.path().join(name), b"content").is_err() {
        // Some filesystems reject invalid UTF-8 names.
        return;
    }
    fs::write(dir.path().join("good.txt"), b"content").unwrap();

    let groups = groups_of(dir.path());
    assert_eq!(groups.len(), 1);

    let (_, stats) = CorpusScanner::new(dir.path()).hash_files().unwrap();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.computed, 1);
}

#[test]
fn test_extremely_long_paths() {
    let dir = tempdir().unwrap();

    let mut current_path = dir.path().to_path_buf();
    let folder_name = "a".repeat(50);

    // 6 levels of 50-char folders = 300+ chars.
    for i in 0..6 {
        current_path = current_path.join(format!("{}_{}", i, folder_name));
        if let Err(e) = fs::create_dir(&current_path) {
            eprintln!(
                "Skipping extremely long path test: failed to create dir: {}",
                e
            );
            return;
        }
    }

    if let Err(e) = fs::write(current_path.join("file.txt"), b"content") {
        eprintln!(
            "Skipping extremely long path test: failed to create file: {}",
            e
        );
        return;
    }
    fs::write(dir.path().join("duplicate.txt"), b"content").unwrap();

    let groups = groups_of(dir.path());

    assert_eq!(groups.len(), 1);
    assert!(groups[0].files[0].path.ends_with("file.txt"));
    assert!(groups[0].files[1].path.ends_with("duplicate.txt"));
}

#[test]
fn test_empty_files_are_duplicates() {
    let dir = tempdir().unwrap();
    File::create(dir.path().join("a.txt")).unwrap();
    File::create(dir.path().join("b.txt")).unwrap();

    let groups = groups_of(dir.path());

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].wasted_space(), 0);
}
