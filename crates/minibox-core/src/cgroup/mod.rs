//! Cgroup resource management.
//!
//! Three v1 subsystem controllers (memory, cpu, cpuset) sit behind the
//! [`Subsystem`] capability interface; [`CgroupManager`] composes them under
//! one per-container group label and fans `set`/`apply`/`destroy` out across
//! the list, fail-fast. New resource dimensions are added by implementing
//! [`Subsystem`], never by touching the manager.

pub mod cpu;
pub mod cpuset;
pub mod hierarchy;
pub mod memory;

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::ResourceConfig;

pub use hierarchy::Hierarchy;

/// File each subsystem writes member PIDs into.
const TASKS_FILE: &str = "tasks";

/// Capability interface of a single cgroup subsystem controller.
///
/// Lifecycle contract: `set` before `apply`, `remove` exactly once per group
/// lifetime after the managed process has terminated. `set` performs no
/// writes at all when its dimension of the config is unconstrained.
pub trait Subsystem {
    /// Subsystem name as it appears in the mount table option list.
    fn name(&self) -> &'static str;

    /// Writes this controller's configured limit into its limit file,
    /// creating the group directory if needed. No-op when the relevant
    /// config field is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the hierarchy is missing or the write fails.
    fn set(&self, hierarchy: &Hierarchy, group: &str, config: &ResourceConfig) -> Result<()>;

    /// Moves a process under this controller's accounting by writing its
    /// pid into the group's task-membership file. The group directory must
    /// already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the group directory is missing or the write fails.
    fn apply(&self, hierarchy: &Hierarchy, group: &str, pid: i32) -> Result<()>;

    /// Deletes the group directory, releasing kernel-side accounting.
    /// Safe to call when no process was ever applied.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails for a reason other than the
    /// directory already being gone.
    fn remove(&self, hierarchy: &Hierarchy, group: &str) -> Result<()>;
}

/// Writes a limit value into a subsystem's limit file, auto-creating the
/// group directory.
fn write_limit(
    hierarchy: &Hierarchy,
    subsystem: &'static str,
    group: &str,
    limit_file: &str,
    value: &str,
) -> Result<()> {
    let dir = hierarchy.group_dir(subsystem, group, true)?;
    let path = dir.join(limit_file);
    std::fs::write(&path, value).map_err(|e| MiniboxError::io(&path, e))?;
    tracing::debug!(subsystem, group, %value, file = limit_file, "cgroup limit set");
    Ok(())
}

/// Writes a pid into a subsystem group's `tasks` file (no auto-create).
fn attach_pid(hierarchy: &Hierarchy, subsystem: &'static str, group: &str, pid: i32) -> Result<()> {
    let dir = hierarchy.group_dir(subsystem, group, false)?;
    let path = dir.join(TASKS_FILE);
    std::fs::write(&path, pid.to_string()).map_err(|e| MiniboxError::io(&path, e))?;
    tracing::debug!(subsystem, group, pid, "process attached to cgroup");
    Ok(())
}

/// Removes a subsystem's group directory; a directory that is already gone
/// is not an error.
fn remove_group(hierarchy: &Hierarchy, subsystem: &'static str, group: &str) -> Result<()> {
    let dir = hierarchy.root(subsystem)?.join(group);
    if !dir.exists() {
        return Ok(());
    }
    remove_dir_best_effort(&dir).map_err(|e| MiniboxError::io(&dir, e))?;
    tracing::debug!(subsystem, group, "cgroup group removed");
    Ok(())
}

/// Kernel cgroup directories cannot be deleted recursively through the VFS
/// the normal way (their control files are virtual), so removal is a plain
/// rmdir. Only a not-empty result falls back to a recursive remove, for
/// plain-directory doubles holding real files; any other errno (EBUSY from
/// live tasks, say) surfaces unchanged.
fn remove_dir_best_effort(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir(dir) {
        Err(e) if e.kind() == std::io::ErrorKind::DirectoryNotEmpty => std::fs::remove_dir_all(dir),
        result => result,
    }
}

/// Composes the fixed, ordered controller list under one group label and
/// drives `set`/`apply`/`destroy` across all of them.
///
/// The label is keyed by container id, so concurrent containers get disjoint
/// group directories. `destroy` runs at most once; if the caller loses the
/// manager without destroying it, `Drop` performs a best-effort removal so
/// kernel accounting is not leaked on early-return paths.
pub struct CgroupManager {
    group: String,
    hierarchy: Hierarchy,
    subsystems: Vec<Box<dyn Subsystem>>,
    destroyed: bool,
}

impl CgroupManager {
    /// Subsystem names managed by the default controller list.
    pub const SUBSYSTEM_NAMES: [&'static str; 3] = ["memory", "cpu", "cpuset"];

    /// Creates a manager for the given group label, discovering subsystem
    /// roots from the process's own mount table.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount table cannot be read.
    pub fn new(group: impl Into<String>) -> Result<Self> {
        let hierarchy = Hierarchy::discover(&Self::SUBSYSTEM_NAMES)?;
        Ok(Self::with_hierarchy(group, hierarchy))
    }

    /// Creates a manager over an explicit hierarchy. Test seam.
    #[must_use]
    pub fn with_hierarchy(group: impl Into<String>, hierarchy: Hierarchy) -> Self {
        Self {
            group: group.into(),
            hierarchy,
            subsystems: vec![
                Box::new(memory::MemorySubsystem),
                Box::new(cpu::CpuSubsystem),
                Box::new(cpuset::CpusetSubsystem),
            ],
            destroyed: false,
        }
    }

    /// Returns the group label this manager owns.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Fans the resource config out to every controller, stopping at the
    /// first error. Controllers whose dimension is unconstrained write
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns the first controller error; earlier controllers are not
    /// rolled back.
    pub fn set(&self, config: &ResourceConfig) -> Result<()> {
        for subsystem in &self.subsystems {
            subsystem.set(&self.hierarchy, &self.group, config)?;
        }
        Ok(())
    }

    /// Attaches a process to every controller group that `set` created,
    /// stopping at the first error. Controllers whose dimension was
    /// unconstrained have no group directory and are skipped, so a run with
    /// partial (or no) limits still starts.
    ///
    /// # Errors
    ///
    /// Returns the first controller error; earlier attachments are not
    /// rolled back.
    pub fn apply(&self, pid: i32) -> Result<()> {
        for subsystem in &self.subsystems {
            let Ok(root) = self.hierarchy.root(subsystem.name()) else {
                continue;
            };
            if !root.join(&self.group).exists() {
                tracing::debug!(
                    subsystem = subsystem.name(),
                    group = %self.group,
                    "no group directory, skipping attach"
                );
                continue;
            }
            subsystem.apply(&self.hierarchy, &self.group, pid)?;
        }
        Ok(())
    }

    /// Leaves the group directories in place and disarms the `Drop`
    /// fallback. Used for detached containers, whose cgroup cleanup belongs
    /// to a reconciliation path outside this runtime.
    pub fn detach(&mut self) {
        self.destroyed = true;
        tracing::debug!(group = %self.group, "cgroup left in place for detached container");
    }

    /// Removes every controller's group directory. Must be called after the
    /// managed process has terminated; further calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns the first controller error encountered.
    pub fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        for subsystem in &self.subsystems {
            subsystem.remove(&self.hierarchy, &self.group)?;
        }
        self.destroyed = true;
        tracing::info!(group = %self.group, "cgroup destroyed");
        Ok(())
    }
}

impl std::fmt::Debug for CgroupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CgroupManager")
            .field("group", &self.group)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl Drop for CgroupManager {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        tracing::warn!(group = %self.group, "cgroup not explicitly destroyed, removing in Drop");
        if let Err(e) = self.destroy() {
            tracing::warn!(group = %self.group, error = %e, "cgroup Drop cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;

    fn fake_hierarchy(root: &std::path::Path) -> Hierarchy {
        let roots: HashMap<String, PathBuf> = CgroupManager::SUBSYSTEM_NAMES
            .iter()
            .map(|name| {
                let dir = root.join(name);
                std::fs::create_dir_all(&dir).expect("subsystem root");
                ((*name).to_owned(), dir)
            })
            .collect();
        Hierarchy::with_roots(roots)
    }

    #[test]
    fn unconstrained_config_creates_no_group_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CgroupManager::with_hierarchy("minibox-t1", fake_hierarchy(dir.path()));

        manager.set(&ResourceConfig::default()).expect("set");

        for name in CgroupManager::SUBSYSTEM_NAMES {
            assert!(
                !dir.path().join(name).join("minibox-t1").exists(),
                "{name} group must not be created for an empty config"
            );
        }
    }

    #[test]
    fn memory_only_config_applies_to_the_memory_group_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CgroupManager::with_hierarchy("minibox-t2", fake_hierarchy(dir.path()));

        let config = ResourceConfig {
            memory_limit: Some("100m".into()),
            ..ResourceConfig::default()
        };
        manager.set(&config).expect("set");
        manager.apply(4321).expect("apply");

        let group_dir = dir.path().join("memory").join("minibox-t2");
        assert_eq!(
            std::fs::read_to_string(group_dir.join("memory.limit_in_bytes")).expect("limit file"),
            "100m"
        );
        assert_eq!(
            std::fs::read_to_string(group_dir.join("tasks")).expect("tasks file"),
            "4321"
        );
        // The unconstrained controllers never grew a group and were skipped.
        assert!(!dir.path().join("cpu").join("minibox-t2").exists());
        assert!(!dir.path().join("cpuset").join("minibox-t2").exists());
    }

    #[test]
    fn apply_without_set_is_a_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CgroupManager::with_hierarchy("minibox-t3", fake_hierarchy(dir.path()));
        manager.apply(1).expect("apply with no limits");
        for name in CgroupManager::SUBSYSTEM_NAMES {
            assert!(!dir.path().join(name).join("minibox-t3").exists());
        }
    }

    #[test]
    fn fully_constrained_config_attaches_to_every_group() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CgroupManager::with_hierarchy("minibox-t6", fake_hierarchy(dir.path()));

        let config = ResourceConfig {
            memory_limit: Some("64m".into()),
            cpu_share: Some("512".into()),
            cpu_set: Some("0".into()),
        };
        manager.set(&config).expect("set");
        manager.apply(7).expect("apply");

        for name in CgroupManager::SUBSYSTEM_NAMES {
            assert_eq!(
                std::fs::read_to_string(dir.path().join(name).join("minibox-t6").join("tasks"))
                    .expect("tasks file"),
                "7"
            );
        }
    }

    #[test]
    fn destroy_removes_groups_and_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = CgroupManager::with_hierarchy("minibox-t4", fake_hierarchy(dir.path()));

        let config = ResourceConfig {
            memory_limit: Some("64m".into()),
            cpu_share: Some("512".into()),
            cpu_set: Some("0".into()),
        };
        manager.set(&config).expect("set");
        manager.destroy().expect("destroy");

        for name in CgroupManager::SUBSYSTEM_NAMES {
            assert!(!dir.path().join(name).join("minibox-t4").exists());
        }
        // Second destroy (and the Drop fallback) must be a no-op.
        manager.destroy().expect("second destroy");
    }

    #[test]
    fn group_removal_descends_into_directory_doubles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let group = dir.path().join("minibox-t7");
        std::fs::create_dir(&group).expect("mkdir");
        std::fs::write(group.join("memory.limit_in_bytes"), "64m").expect("write");

        remove_dir_best_effort(&group).expect("remove");
        assert!(!group.exists());
    }

    #[test]
    fn group_removal_preserves_unrelated_errors() {
        // A plain rmdir failure other than not-empty must not be masked by
        // the recursive fallback.
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").expect("write");

        let err = remove_dir_best_effort(&file).expect_err("must fail");
        assert_eq!(err.kind(), std::io::ErrorKind::NotADirectory);
        assert!(file.exists());
    }

    #[test]
    fn set_fails_fast_when_a_hierarchy_is_missing() {
        // Only memory mounted: cpu controller must surface the error.
        let dir = tempfile::tempdir().expect("tempdir");
        let hierarchy = Hierarchy::with_roots(HashMap::from([(
            "memory".to_owned(),
            dir.path().to_path_buf(),
        )]));
        let manager = CgroupManager::with_hierarchy("minibox-t5", hierarchy);

        let config = ResourceConfig {
            memory_limit: Some("100m".into()),
            cpu_share: Some("512".into()),
            cpu_set: None,
        };
        let err = manager.set(&config).expect_err("cpu hierarchy missing");
        assert!(err.to_string().contains("cpu"));
        // Memory ran before the failure and is not rolled back.
        assert!(dir.path().join("minibox-t5").exists());
    }
}
