//! Memory limit controller (`memory.limit_in_bytes`).

use minibox_common::error::Result;
use minibox_common::types::ResourceConfig;

use super::{Hierarchy, Subsystem};

/// Limit file written by this controller.
const LIMIT_FILE: &str = "memory.limit_in_bytes";

/// Controller for the `memory` subsystem.
#[derive(Debug, Clone, Copy)]
pub struct MemorySubsystem;

impl Subsystem for MemorySubsystem {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn set(&self, hierarchy: &Hierarchy, group: &str, config: &ResourceConfig) -> Result<()> {
        match &config.memory_limit {
            Some(limit) => super::write_limit(hierarchy, self.name(), group, LIMIT_FILE, limit),
            None => Ok(()),
        }
    }

    fn apply(&self, hierarchy: &Hierarchy, group: &str, pid: i32) -> Result<()> {
        super::attach_pid(hierarchy, self.name(), group, pid)
    }

    fn remove(&self, hierarchy: &Hierarchy, group: &str) -> Result<()> {
        super::remove_group(hierarchy, self.name(), group)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn hierarchy(root: &std::path::Path) -> Hierarchy {
        Hierarchy::with_roots(HashMap::from([("memory".to_owned(), root.to_path_buf())]))
    }

    #[test]
    fn set_writes_configured_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ResourceConfig {
            memory_limit: Some("100m".into()),
            ..ResourceConfig::default()
        };
        MemorySubsystem
            .set(&hierarchy(dir.path()), "g", &config)
            .expect("set");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("g").join("memory.limit_in_bytes"))
                .expect("limit file"),
            "100m"
        );
    }

    #[test]
    fn set_is_noop_without_memory_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ResourceConfig {
            cpu_share: Some("512".into()),
            ..ResourceConfig::default()
        };
        MemorySubsystem
            .set(&hierarchy(dir.path()), "g", &config)
            .expect("set");
        assert!(!dir.path().join("g").exists());
    }
}
