//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] computes the exact content digest of a file by streaming it in
//! fixed-size chunks, so memory use is independent of file size. The file
//! handle is owned by the hashing call and dropped on every return path.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::HashError;

/// A 32-byte BLAKE3 digest.
pub type Digest = [u8; 32];

/// Chunk size used when streaming file contents (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Streaming BLAKE3 hasher.
#[derive(Debug, Clone, Default)]
pub struct Hasher {
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Hasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort long reads when the shutdown flag is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error wrapped in [`HashError`]; callers
    /// decide which kinds are recoverable.
    pub fn full_hash(&self, path: &Path) -> Result<Digest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(path, file)
    }

    /// Hash everything a reader yields.
    pub(crate) fn hash_reader<R: Read>(&self, path: &Path, mut reader: R) -> Result<Digest, HashError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(ErrorKind::Interrupted, "shutdown requested"),
                });
            }

            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Convert a digest to its lowercase hex representation.
#[must_use]
pub fn hash_to_hex(hash: &Digest) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}

/// Parse a 64-character hex string back into a digest.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Digest> {
    blake3::Hash::from_hex(hex).ok().map(|h| *h.as_bytes())
}
