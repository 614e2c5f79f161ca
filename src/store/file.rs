use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{RecordKey, Store};

/// Store that keeps one JSON file per record in a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn record_path(&self, key: RecordKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.name()))
    }
}

impl Store for FileStore {
    fn read(&self, key: RecordKey) -> Result<Option<String>> {
        let path = self.record_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read record file: {}", path.display()))?;

        Ok(Some(content))
    }

    fn write(&self, key: RecordKey, contents: &str) -> Result<()> {
        let path = self.record_path(key);

        atomic_write(&path, contents.as_bytes(), key.is_secret())
            .with_context(|| format!("Failed to write record file: {}", path.display()))
    }

    fn remove(&self, key: RecordKey) -> Result<()> {
        let path = self.record_path(key);

        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete record file: {}", path.display()))?;
        }

        Ok(())
    }
}

/// Get the platform-specific data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "screen-guard")
        .context("Could not determine data directory location")?;

    Ok(dirs.data_local_dir().to_path_buf())
}

/// Write to a temporary sibling, sync, then rename over the target
fn atomic_write(path: &Path, content: &[u8], restricted: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = File::create(&temp_path).with_context(|| {
            format!("Failed to create temporary file: {}", temp_path.display())
        })?;

        file.write_all(content)
            .context("Failed to write to temporary file")?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    if restricted {
        set_owner_only(&temp_path)?;
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

/// Restrict a file to its owner (0600). No-op on Windows.
fn set_owner_only(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = std::fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?
            .permissions();
        permissions.set_mode(0o600);

        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions for: {}", path.display()))?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read_record() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.write(RecordKey::Session, r#"{"authenticated":true}"#).unwrap();

        let content = store.read(RecordKey::Session).unwrap();
        assert_eq!(content.as_deref(), Some(r#"{"authenticated":true}"#));
        assert!(!temp_dir.path().join("session.tmp").exists());
    }

    #[test]
    fn test_read_missing_record() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());

        assert!(store.read(RecordKey::Timer).unwrap().is_none());
    }

    #[test]
    fn test_write_creates_nested_directory() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("nested").join("data"));

        store.write(RecordKey::Timer, "{}").unwrap();
        assert!(store.record_path(RecordKey::Timer).exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.write(RecordKey::Pin, "\"hash\"").unwrap();
        store.remove(RecordKey::Pin).unwrap();
        store.remove(RecordKey::Pin).unwrap();

        assert!(store.read(RecordKey::Pin).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_pin_record_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.write(RecordKey::Pin, "\"hash\"").unwrap();

        let mode = std::fs::metadata(store.record_path(RecordKey::Pin))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
