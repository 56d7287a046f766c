//! On-disk container registry.
//!
//! One directory per container name under the run directory, each holding a
//! single JSON record. Records are created when a container starts and
//! deleted when an attached container's wait completes; detached containers
//! keep their record until an external action reconciles it.

use std::path::{Path, PathBuf};

use minibox_common::constants::{CONFIG_NAME, RUN_DIR};
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::ContainerRecord;

/// Handle to the registry's backing directory.
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
}

impl Default for Registry {
    fn default() -> Self {
        Self::open()
    }
}

impl Registry {
    /// Opens the registry at the default run directory.
    #[must_use]
    pub fn open() -> Self {
        Self::rooted_at(RUN_DIR)
    }

    /// Opens a registry under an explicit root. Test seam.
    #[must_use]
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn container_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.container_dir(name).join(CONFIG_NAME)
    }

    /// Persists a record, creating the container's directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation, serialization, or the write
    /// fails.
    pub fn record(&self, record: &ContainerRecord) -> Result<()> {
        let dir = self.container_dir(&record.name);
        std::fs::create_dir_all(&dir).map_err(|e| MiniboxError::io(&dir, e))?;
        let path = self.record_path(&record.name);
        let json = serde_json::to_string(record)?;
        std::fs::write(&path, json).map_err(|e| MiniboxError::io(&path, e))?;
        tracing::info!(name = %record.name, id = %record.id, "container recorded");
        Ok(())
    }

    /// Loads the record of a named container.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the container has no record, or a
    /// deserialization error for a corrupt one.
    pub fn get(&self, name: &str) -> Result<ContainerRecord> {
        let path = self.record_path(name);
        if !path.exists() {
            return Err(MiniboxError::NotFound {
                kind: "container",
                id: name.to_owned(),
            });
        }
        let json = std::fs::read_to_string(&path).map_err(|e| MiniboxError::io(&path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Deletes a container's record, removing its entire backing directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    pub fn delete(&self, name: &str) -> Result<()> {
        let dir = self.container_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| MiniboxError::io(&dir, e))?;
        }
        tracing::info!(name, "container record deleted");
        Ok(())
    }

    /// Reads all records for listing. Unreadable entries are skipped with a
    /// logged error rather than failing the whole listing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the registry root exists but cannot be read.
    pub fn list(&self) -> Result<Vec<ContainerRecord>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.root).map_err(|e| MiniboxError::io(&self.root, e))?;
        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MiniboxError::io(&self.root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            match self.get(&name) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::error!(name, error = %e, "skipping unreadable container record");
                }
            }
        }
        Ok(records)
    }

    /// Returns the registry root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use minibox_common::types::{ContainerId, ContainerStatus};

    use super::*;

    fn sample_record() -> ContainerRecord {
        ContainerRecord::new(&ContainerId::generate(), 1234, &["sh".into()], None)
    }

    #[test]
    fn record_then_get_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Registry::rooted_at(dir.path());
        let record = sample_record();

        registry.record(&record).expect("record");
        let loaded = registry.get(&record.name).expect("get");
        assert_eq!(loaded, record);
        assert_eq!(loaded.status, ContainerStatus::Running);
        assert_eq!(loaded.name, loaded.id);
        assert_eq!(loaded.id.len(), ContainerId::LEN);
    }

    #[test]
    fn delete_removes_the_backing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Registry::rooted_at(dir.path());
        let record = sample_record();

        registry.record(&record).expect("record");
        assert!(dir.path().join(&record.name).is_dir());

        registry.delete(&record.name).expect("delete");
        assert!(!dir.path().join(&record.name).exists());
        assert!(matches!(
            registry.get(&record.name),
            Err(MiniboxError::NotFound { .. })
        ));
    }

    #[test]
    fn list_skips_unreadable_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Registry::rooted_at(dir.path());

        let record = sample_record();
        registry.record(&record).expect("record");

        // A directory without a config file must not break the listing.
        std::fs::create_dir(dir.path().join("broken")).expect("mkdir");

        let records = registry.list().expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, record.name);
    }

    #[test]
    fn list_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Registry::rooted_at(dir.path().join("never-created"));
        assert!(registry.list().expect("list").is_empty());
    }
}
