//! Content fingerprints and the per-path fingerprint computation.
//!
//! A [`Fingerprint`] is either an exact BLAKE3 digest or a perceptual code.
//! Which one a file gets depends only on its extension: recognised image
//! extensions are perceptually hashed, everything else (and images whose
//! format has no decoder) gets an exact digest.
//!
//! Corrupt images and permission errors become [`FingerprintOutcome::Failed`]
//! so a single bad file never aborts a batch; the file is simply left out of
//! the cache and retried on the next scan.

use std::io::ErrorKind;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::hasher::{hash_to_hex, hex_to_hash, Digest, Hasher};
use super::perceptual::{PerceptualError, PerceptualHasher};
use super::HashError;

/// Extensions (lowercase, without dot) that are perceptually hashed.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "heic", "bmp", "tif", "tiff", "webp",
];

/// A content fingerprint.
///
/// The two kinds never compare equal and have no distance between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fingerprint {
    /// BLAKE3 digest of the full byte stream.
    Exact {
        /// Raw digest bytes, hex encoded on disk.
        #[serde(with = "hex_digest")]
        digest: Digest,
    },
    /// Perceptual bit vector compared with Hamming distance.
    Perceptual {
        /// Raw code bytes, base64 encoded on disk.
        #[serde(with = "base64_code")]
        code: Vec<u8>,
    },
}

impl Fingerprint {
    /// Whether this is a perceptual code.
    #[must_use]
    pub fn is_perceptual(&self) -> bool {
        matches!(self, Self::Perceptual { .. })
    }

    /// Hamming distance between two perceptual codes of the same length.
    ///
    /// Returns `None` for exact digests, mixed kinds, or codes of different
    /// lengths (for example, produced by different hash sizes).
    #[must_use]
    pub fn distance(&self, other: &Self) -> Option<u32> {
        match (self, other) {
            (Self::Perceptual { code: a }, Self::Perceptual { code: b }) if a.len() == b.len() => {
                Some(hamming(a, b))
            }
            _ => None,
        }
    }

    /// Short printable form used in reports.
    #[must_use]
    pub fn short(&self) -> String {
        match self {
            Self::Exact { digest } => hash_to_hex(digest)[..16].to_string(),
            Self::Perceptual { code } => STANDARD.encode(code),
        }
    }
}

/// Hamming distance between two equal-length byte strings.
#[must_use]
pub fn hamming(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Result of fingerprinting one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintOutcome {
    /// A valid fingerprint.
    Computed(Fingerprint),
    /// A recoverable failure (corrupt image, permission denied).
    Failed(String),
}

/// Whether the path has a recognised image extension.
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Fingerprint a single path.
///
/// # Errors
///
/// Only unexpected I/O errors (anything other than permission denied or
/// corrupt image data) are returned; the caller must not let them stop the
/// rest of the batch.
pub fn compute_fingerprint(
    path: &Path,
    hasher: &Hasher,
    perceptual: &PerceptualHasher,
) -> Result<FingerprintOutcome, HashError> {
    if is_image_path(path) {
        match perceptual.compute_code(path) {
            Ok(code) => return Ok(FingerprintOutcome::Computed(Fingerprint::Perceptual { code })),
            Err(PerceptualError::UnsupportedFormat(_)) => {
                log::trace!("No decoder for {}, using exact digest", path.display());
            }
            Err(PerceptualError::Decode(_, e)) => {
                log::warn!("Corrupt image {}: {}", path.display(), e);
                return Ok(FingerprintOutcome::Failed(format!("corrupt image: {}", e)));
            }
            Err(PerceptualError::Io(_, e)) => match e.kind() {
                ErrorKind::PermissionDenied => {
                    log::warn!("Permission denied: {}", path.display());
                    return Ok(FingerprintOutcome::Failed("permission denied".to_string()));
                }
                ErrorKind::UnexpectedEof | ErrorKind::InvalidData => {
                    log::warn!("Truncated image {}: {}", path.display(), e);
                    return Ok(FingerprintOutcome::Failed(format!("corrupt image: {}", e)));
                }
                _ => return Err(HashError::from_io(path, e)),
            },
        }
    }

    match hasher.full_hash(path) {
        Ok(digest) => Ok(FingerprintOutcome::Computed(Fingerprint::Exact { digest })),
        Err(HashError::Io { source, .. }) if source.kind() == ErrorKind::PermissionDenied => {
            log::warn!("Permission denied: {}", path.display());
            Ok(FingerprintOutcome::Failed("permission denied".to_string()))
        }
        Err(e) => Err(e),
    }
}

mod hex_digest {
    use super::{hash_to_hex, hex_to_hash, Digest};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digest: &Digest, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hash_to_hex(digest))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Digest, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex_to_hash(&hex).ok_or_else(|| serde::de::Error::custom("invalid digest hex"))
    }
}

mod base64_code {
    use super::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(code: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(code))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
