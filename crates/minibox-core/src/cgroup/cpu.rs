//! CPU share controller (`cpu.shares`).

use minibox_common::error::Result;
use minibox_common::types::ResourceConfig;

use super::{Hierarchy, Subsystem};

/// Limit file written by this controller.
const LIMIT_FILE: &str = "cpu.shares";

/// Controller for the `cpu` subsystem.
#[derive(Debug, Clone, Copy)]
pub struct CpuSubsystem;

impl Subsystem for CpuSubsystem {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn set(&self, hierarchy: &Hierarchy, group: &str, config: &ResourceConfig) -> Result<()> {
        match &config.cpu_share {
            Some(share) => super::write_limit(hierarchy, self.name(), group, LIMIT_FILE, share),
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
