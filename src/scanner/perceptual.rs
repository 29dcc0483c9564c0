//! Perceptual image hashing for near-duplicate detection.
//!
//! This module provides the [`PerceptualHasher`] which reduces a decoded
//! image to a small luminance grid and derives a fixed-length bit vector
//! from it. Visually similar images map to codes with a small Hamming
//! distance.

use image::ImageError;
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Supported perceptual hashing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualAlgorithm {
    /// pHash (Perceptual Hash) - DCT-based, most resilient to transformations.
    #[default]
    Phash,
    /// dHash (Difference Hash) - Gradient-based, very fast and effective.
    Dhash,
    /// aHash (Average Hash) - Mean-based, fast but less resilient.
    Ahash,
}

impl std::fmt::Display for PerceptualAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Phash => write!(f, "pHash"),
            Self::Dhash => write!(f, "dHash"),
            Self::Ahash => write!(f, "aHash"),
        }
    }
}

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// No decoder is available for this format.
    #[error("Unsupported image format for {0}")]
    UnsupportedFormat(String),

    /// The image data is corrupt or cannot be decoded.
    #[error("Failed to decode image {0}: {1}")]
    Decode(String, #[source] ImageError),

    /// The file could not be read.
    #[error("Failed to read image {0}: {1}")]
    Io(String, #[source] std::io::Error),
}

/// Computes perceptual hashes for images.
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
    algorithm: PerceptualAlgorithm,
}

impl std::fmt::Debug for PerceptualHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerceptualHasher")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl PerceptualHasher {
    /// Create a new `PerceptualHasher` with the given algorithm.
    pub fn new(algorithm: PerceptualAlgorithm) -> Self {
        let mut config = HasherConfig::new().hash_size(8, 8);

        match algorithm {
            PerceptualAlgorithm::Phash => {
                config = config.hash_alg(HashAlg::Median).preproc_dct();
            }
            PerceptualAlgorithm::Dhash => {
                config = config.hash_alg(HashAlg::Gradient);
            }
            PerceptualAlgorithm::Ahash => {
                config = config.hash_alg(HashAlg::Mean);
            }
        }

        Self {
            hasher: config.to_hasher(),
            algorithm,
        }
    }

    /// Compute the perceptual code for the image at the given path.
    ///
    /// # Errors
    ///
    /// Distinguishes formats without a decoder (callers fall back to an exact
    /// digest) from corrupt data and read failures.
    pub fn compute_code<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>, PerceptualError> {
        let path = path.as_ref();
        let name = path.display().to_string();

        let img = image::open(path).map_err(|e| match e {
            ImageError::Unsupported(_) => PerceptualError::UnsupportedFormat(name.clone()),
            ImageError::IoError(io) => PerceptualError::Io(name.clone(), io),
            other => PerceptualError::Decode(name.clone(), other),
        })?;

        Ok(self.hasher.hash_image(&img).as_bytes().to_vec())
    }

    /// Get the algorithm used by this hasher.
    pub fn algorithm(&self) -> PerceptualAlgorithm {
        self.algorithm
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(PerceptualAlgorithm::Phash)
    }
}
