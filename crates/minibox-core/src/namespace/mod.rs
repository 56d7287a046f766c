//! Namespace isolation configuration.
//!
//! The launcher creates all namespaces atomically with the spawn by passing
//! the corresponding clone flags to `clone(2)`; this module only decides
//! which flags those are.

/// Which namespace kinds to create for a container.
///
/// User namespaces are deliberately not offered — minibox does no UID
/// remapping.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct NamespaceConfig {
    /// Isolate hostname and domain name (UTS).
    pub uts: bool,
    /// Isolate the process-id tree.
    pub pid: bool,
    /// Isolate the mount table.
    pub mount: bool,
    /// Isolate the network stack.
    pub network: bool,
    /// Isolate System V IPC and POSIX message queues.
    pub ipc: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            uts: true,
            pid: true,
            mount: true,
            network: true,
            ipc: true,
        }
    }
}

#[cfg(target_os = "linux")]
impl NamespaceConfig {
    /// Translates the configuration into `clone(2)` flags.
    #[must_use]
    pub fn clone_flags(&self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;

        let mut flags = CloneFlags::empty();
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.network {
            flags |= CloneFlags::CLONE_NEWNET;
        }
        if self.ipc {
            flags |= CloneFlags::CLONE_NEWIPC;
        }
        flags
    }
}
