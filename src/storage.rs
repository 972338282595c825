use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Key under which an external collaborator caches a payload for the
/// replay action
pub const FORM_DATA_KEY: &str = "formData";

/// Narrow key-value capability over locally scoped storage.
///
/// The chat view only ever reads from it; writes exist for
/// collaborators (and tests) that seed the cache.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed store, one file per key under the parley home
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).context("Failed to create store directory")?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path).context("Failed to read stored value")?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::write(self.path_for(key), value).context("Failed to write stored value")?;
        Ok(())
    }
}
