use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{ExportError, Result};

/// Storage collaborator for finished buffers, images, and documents.
///
/// Every name is derived from content, so storing the same name twice
/// stores the same bytes.
pub trait AssetStore: Send + Sync {
    fn store(&self, name: &str, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;

    fn fetch(&self, name: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Writes files under a root directory.
///
/// With `deep_filenames`, a name `abcdef.buf` is stored as
/// `root/ab/cd/abcdef.buf` to keep directories small.
pub struct FileAssetStore {
    root_path: PathBuf,
    deep_filenames: bool,
}

impl FileAssetStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root_path: root.as_ref().to_path_buf(),
            deep_filenames: false,
        }
    }

    #[must_use]
    pub fn with_deep_filenames(mut self, deep: bool) -> Self {
        self.deep_filenames = deep;
        self
    }

    #[inline]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Full path a stored name lands at.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        if self.deep_filenames {
            let stem = name.split('.').next().unwrap_or(name);
            if let (Some(first), Some(second)) = (stem.get(0..2), stem.get(2..4)) {
                return self.root_path.join(first).join(second).join(name);
            }
        }
        self.root_path.join(name)
    }
}

impl AssetStore for FileAssetStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(name);
        let io_err = |source| ExportError::Storage {
            name: name.to_string(),
            source,
        };
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(io_err)?;
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name);
        tokio::fs::read(&path)
            .await
            .map_err(|source| ExportError::Storage {
                name: name.to_string(),
                source,
            })
    }
}

/// In-process store keyed by name.
#[derive(Default)]
pub struct MemoryAssetStore {
    files: RwLock<FxHashMap<String, Vec<u8>>>,
}

impl MemoryAssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl AssetStore for MemoryAssetStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.files.write().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        self.get(name).ok_or_else(|| ExportError::StorageFailed {
            name: name.to_string(),
            reason: "not found".to_string(),
        })
    }
}
