//! Cgroup v1 hierarchy discovery.
//!
//! Each subsystem (memory, cpu, cpuset) is mounted somewhere in the process's
//! mount table; the mount whose option list contains the subsystem name is
//! that subsystem's root. Group directories are resolved by joining the root
//! with the container's group label.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use minibox_common::constants::MOUNTINFO_PATH;
use minibox_common::error::{MiniboxError, Result};

/// Resolved mount roots for the cgroup subsystems, keyed by subsystem name.
///
/// Built once per manager from `/proc/self/mountinfo`; tests construct one
/// directly over temporary directories instead.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    roots: HashMap<String, PathBuf>,
}

impl Hierarchy {
    /// Discovers subsystem roots by scanning the process's own mount table.
    ///
    /// Subsystems that are not mounted simply stay absent; resolution for
    /// them fails later with a subsystem-specific error.
    ///
    /// # Errors
    ///
    /// Returns an error if the mountinfo pseudo-file cannot be read.
    pub fn discover(subsystems: &[&str]) -> Result<Self> {
        let content = std::fs::read_to_string(MOUNTINFO_PATH)
            .map_err(|e| MiniboxError::io(MOUNTINFO_PATH, e))?;
        Ok(Self::from_mountinfo(&content, subsystems))
    }

    /// Parses subsystem roots out of mountinfo-formatted text.
    ///
    /// For each line, the fifth whitespace-separated field is the mount
    /// point and the last field is the comma-separated super-block option
    /// list; a subsystem's root is the mount point of the first line whose
    /// options contain its name.
    #[must_use]
    pub fn from_mountinfo(content: &str, subsystems: &[&str]) -> Self {
        let mut roots = HashMap::new();
        for line in content.lines() {
            let fields: Vec<&str> = line.split(' ').collect();
            let (Some(mount_point), Some(options)) = (fields.get(4), fields.last()) else {
                continue;
            };
            for subsystem in subsystems {
                if options.split(',').any(|opt| opt == *subsystem) {
                    let _ = roots
                        .entry((*subsystem).to_owned())
                        .or_insert_with(|| PathBuf::from(mount_point));
                }
            }
        }
        Self { roots }
    }

    /// Builds a hierarchy over explicit roots. Test seam.
    #[must_use]
    pub fn with_roots(roots: HashMap<String, PathBuf>) -> Self {
        Self { roots }
    }

    /// Returns the mount root of a subsystem.
    ///
    /// # Errors
    ///
    /// Returns an error if the subsystem has no mounted hierarchy.
    pub fn root(&self, subsystem: &'static str) -> Result<&Path> {
        self.roots
            .get(subsystem)
            .map(PathBuf::as_path)
            .ok_or(MiniboxError::Cgroup {
                subsystem,
                message: "no mounted hierarchy found for subsystem".to_owned(),
            })
    }

    /// Resolves the group directory for a subsystem, optionally creating it.
    ///
    /// `apply` and `remove` resolve without auto-create; only `set` creates
    /// the directory, which is what makes "directory exists iff a limit was
    /// set or applied" hold.
    ///
    /// # Errors
    ///
    /// Returns an error if the subsystem is not mounted, the directory is
    /// missing and `auto_create` is false, or creation fails.
    pub fn group_dir(
        &self,
        subsystem: &'static str,
        group: &str,
        auto_create: bool,
    ) -> Result<PathBuf> {
        let dir = self.root(subsystem)?.join(group);
        if dir.exists() {
            return Ok(dir);
        }
        if !auto_create {
            return Err(MiniboxError::Cgroup {
                subsystem,
                message: format!("group directory {} does not exist", dir.display()),
            });
        }
        std::fs::create_dir(&dir).map_err(|e| MiniboxError::io(&dir, e))?;
        tracing::debug!(subsystem, path = %dir.display(), "created cgroup group directory");
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
25 30 0:23 / /sys/fs/cgroup/memory rw,nosuid,nodev,noexec,relatime shared:9 - cgroup cgroup rw,memory
26 30 0:24 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid,nodev,noexec,relatime shared:10 - cgroup cgroup rw,cpu,cpuacct
27 30 0:25 / /sys/fs/cgroup/cpuset rw,nosuid,nodev,noexec,relatime shared:11 - cgroup cgroup rw,cpuset
30 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw";

    #[test]
    fn finds_each_subsystem_mount_point() {
        let hierarchy = Hierarchy::from_mountinfo(SAMPLE, &["memory", "cpu", "cpuset"]);
        assert_eq!(
            hierarchy.root("memory").expect("memory root"),
            Path::new("/sys/fs/cgroup/memory")
        );
        assert_eq!(
            hierarchy.root("cpu").expect("cpu root"),
            Path::new("/sys/fs/cgroup/cpu,cpuacct")
        );
        assert_eq!(
            hierarchy.root("cpuset").expect("cpuset root"),
            Path::new("/sys/fs/cgroup/cpuset")
        );
    }

    #[test]
    fn option_match_is_exact_not_substring() {
        // "cpuset" must not match a mount whose only option is "cpu".
        let hierarchy = Hierarchy::from_mountinfo(SAMPLE, &["cpuset"]);
        assert_eq!(
            hierarchy.root("cpuset").expect("cpuset root"),
            Path::new("/sys/fs/cgroup/cpuset")
        );
    }

    #[test]
    fn missing_subsystem_is_an_error() {
        let hierarchy = Hierarchy::from_mountinfo(SAMPLE, &["memory"]);
        assert!(hierarchy.root("pids").is_err());
    }

    #[test]
    fn group_dir_auto_create_and_resolve() {
        let dir = tempfile::tempdir().expect("tempdir");
        let hierarchy = Hierarchy::with_roots(HashMap::from([(
            "memory".to_owned(),
            dir.path().to_path_buf(),
        )]));

        // Without auto-create the missing group is an error.
        assert!(hierarchy.group_dir("memory", "minibox-1", false).is_err());

        let created = hierarchy
            .group_dir("memory", "minibox-1", true)
            .expect("auto-create");
        assert!(created.is_dir());

        // Now resolvable without auto-create.
        let resolved = hierarchy
            .group_dir("memory", "minibox-1", false)
            .expect("resolve");
        assert_eq!(resolved, created);
    }
}
