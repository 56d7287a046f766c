//! CPU set controller (`cpuset.cpus`).

use minibox_common::error::Result;
use minibox_common::types::ResourceConfig;

use super::{Hierarchy, Subsystem};

/// Limit file written by this controller.
const LIMIT_FILE: &str = "cpuset.cpus";

/// Controller for the `cpuset` subsystem.
#[derive(Debug, Clone, Copy)]
pub struct CpusetSubsystem;

impl Subsystem for CpusetSubsystem {
    fn name(&self) -> &'static str {
        "cpuset"
    }

    fn set(&self, hierarchy: &Hierarchy, group: &str, config: &ResourceConfig) -> Result<()> {
        match &config.cpu_set {
            Some(cpus) => super::write_limit(hierarchy, self.name(), group, LIMIT_FILE, cpus),
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
