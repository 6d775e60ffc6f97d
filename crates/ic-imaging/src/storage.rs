//! Filesystem blob storage for file-backed fields.
//!
//! Field values are storage-relative names resolved under a single root
//! directory. Names must stay inside the root: absolute paths and `..`
//! components are rejected.

use std::io;
use std::path::{Component, Path, PathBuf};

use ic_core::config::StorageConfig;
use ic_core::{Error, FieldFile, Result};

/// Root-relative blob storage on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a new `FileStorage` rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage-relative name to its filesystem path.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let contained = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(Error::Validation(format!(
                "storage name '{name}' must be a relative path inside the storage root"
            )));
        }
        Ok(self.root.join(relative))
    }

    /// The filesystem path of a field value.
    pub fn path(&self, file: &FieldFile) -> Result<PathBuf> {
        self.resolve(file.name())
    }

    /// Whether the blob behind a field value is present on disk.
    pub fn exists(&self, file: &FieldFile) -> bool {
        self.path(file).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Pixel dimensions of an image blob, read from its header.
    pub fn dimensions(&self, file: &FieldFile) -> Result<(u32, u32)> {
        crate::codec::probe_dimensions(&self.path(file)?)
    }

    /// Write a blob under `name`, creating parent directories as needed.
    pub fn store(&self, name: &str, data: &[u8]) -> Result<FieldFile> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, data)?;
        tracing::debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(FieldFile::new(name))
    }

    /// Remove a blob by path. A blob that is already gone counts as removed
    /// and yields `Ok(false)`.
    pub fn remove_path(&self, path: &Path) -> io::Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
