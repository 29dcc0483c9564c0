//! Platform oracle for hidden and system directories.
//!
//! The walker never branches on the platform itself; it asks an
//! [`AttributeOracle`] chosen once at startup by [`platform_oracle`].

use std::path::Path;
use std::sync::Arc;

/// Answers whether a path is hidden or a system entry on this platform.
pub trait AttributeOracle: Send + Sync + std::fmt::Debug {
    /// Returns `true` if the path should be treated as hidden or system.
    fn is_hidden_or_system(&self, path: &Path) -> bool;
}

/// Unix-style oracle: an entry is hidden when its name starts with `.`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DotPrefixOracle;

impl AttributeOracle for DotPrefixOracle {
    fn is_hidden_or_system(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.') && n != "." && n != "..")
    }
}

/// Windows oracle backed by the hidden and system file attribute bits.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct FileAttributeOracle;

#[cfg(windows)]
impl AttributeOracle for FileAttributeOracle {
    fn is_hidden_or_system(&self, path: &Path) -> bool {
        use std::os::windows::fs::MetadataExt;

        const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
        const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

        match std::fs::symlink_metadata(path) {
            Ok(metadata) => {
                metadata.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0
            }
            Err(e) => {
                log::debug!("Could not read attributes of {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Oracle that never reports anything as hidden. Useful in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHiddenOracle;

impl AttributeOracle for NoHiddenOracle {
    fn is_hidden_or_system(&self, _path: &Path) -> bool {
        false
    }
}

/// Select the oracle for the current platform.
#[must_use]
pub fn platform_oracle() -> Arc<dyn AttributeOracle> {
    #[cfg(windows)]
    {
        Arc::new(FileAttributeOracle)
    }

    #[cfg(not(windows))]
    {
        Arc::new(DotPrefixOracle)
    }
}
