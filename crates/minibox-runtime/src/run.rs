//! The `run` orchestration.
//!
//! Single thread of control: prepare workspace → spawn → record → cgroup
//! set → cgroup apply → send command → (attached) wait → cleanup. The only
//! synchronization with the child is the command channel's write-then-close
//! / read-until-EOF handshake, which guarantees the child never execs
//! before it has the full command; since exec preserves the pid, cgroup
//! limits applied against that pid hold across the handoff.

use minibox_common::constants::CGROUP_PREFIX;
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::{ContainerId, ContainerRecord, ResourceConfig};
use minibox_core::cgroup::CgroupManager;
use minibox_core::filesystem::{Volume, Workspace};
use minibox_core::namespace::NamespaceConfig;
use nix::unistd::Pid;

use crate::launcher;
use crate::pipe::CommandSink;
use crate::registry::Registry;

/// Options of a single `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Attach the container's stdio to the caller's (attached mode: the
    /// call blocks until the container exits and cleans up after it).
    pub interactive: bool,
    /// Detached mode: return right after the command is sent, leaving
    /// cgroup, workspace, and registry record to external reconciliation.
    pub detach: bool,
    /// Resource limits to apply before the workload starts.
    pub resources: ResourceConfig,
    /// Optional `host:container` volume spec.
    pub volume: Option<String>,
    /// Optional container name; defaults to the generated id.
    pub name: Option<String>,
}

/// Runs a container. Attached mode blocks until the workload exits;
/// detached mode returns immediately after the command is sent.
///
/// # Errors
///
/// Fails fast on the first error: invalid arguments, workspace preparation,
/// spawn, registry write, cgroup set/apply, or command send. No step is
/// retried. Any failure after the spawn reaps the child and removes the
/// record, cgroup, and workspace before the error is returned, so a failed
/// start leaves nothing behind.
pub fn run(command: &[String], options: &RunOptions) -> Result<()> {
    if command.is_empty() {
        return Err(MiniboxError::Config {
            message: "run requires at least one command argument".to_owned(),
        });
    }
    if options.interactive && options.detach {
        return Err(MiniboxError::Config {
            message: "interactive and detach are mutually exclusive".to_owned(),
        });
    }

    let volume = options
        .volume
        .as_deref()
        .filter(|spec| !spec.is_empty())
        .map(Volume::parse)
        .transpose()?;

    let id = ContainerId::generate();
    let workspace = Workspace::new(id.as_str(), volume);
    workspace.prepare()?;

    let (pid, sink) = match launcher::launch(&workspace, &NamespaceConfig::default(), options.interactive)
    {
        Ok(spawned) => spawned,
        Err(e) => {
            if let Err(td) = workspace.teardown() {
                tracing::warn!(error = %td, "workspace teardown after spawn failure failed");
            }
            return Err(e);
        }
    };

    let registry = Registry::open();
    let record = ContainerRecord::new(&id, pid.as_raw(), command, options.name.clone());

    let group = format!("{CGROUP_PREFIX}{id}");
    let mut cgroup = match start(&registry, &record, group, &options.resources, pid, sink, command) {
        Ok(cgroup) => cgroup,
        Err(e) => {
            discard_failed_container(pid, &registry, &record.name, &workspace);
            return Err(e);
        }
    };

    if !options.interactive {
        cgroup.detach();
        tracing::info!(name = %record.name, pid = pid.as_raw(), "container detached");
        return Ok(());
    }

    let status = launcher::wait(pid)?;
    tracing::info!(name = %record.name, ?status, "container exited");

    cgroup.destroy()?;
    registry.delete(&record.name)?;
    workspace.teardown()?;
    Ok(())
}

/// The fallible steps between spawn and handoff: persist the record, build
/// and apply the cgroup, send the command. Consuming the sink means it is
/// closed on every exit — on the error paths that is what makes the child
/// read EOF, fail on the empty command, and exit. A manager created before
/// the failure removes its group via `Drop` on the way out.
fn start(
    registry: &Registry,
    record: &ContainerRecord,
    group: String,
    resources: &ResourceConfig,
    pid: Pid,
    sink: CommandSink,
    command: &[String],
) -> Result<CgroupManager> {
    registry.record(record)?;
    // Scoped: any early return below removes the group via Drop; the
    // detached success path opts out explicitly in the caller.
    let mut cgroup = CgroupManager::new(group)?;
    cgroup.set(resources)?;
    cgroup.apply(pid.as_raw())?;
    sink.send(command)?;
    Ok(cgroup)
}

/// Cleanup after a spawned container fails to start. The command channel is
/// already closed, so the child exits on its empty command and is reaped
/// here; the registry record and workspace go with it. Each step is
/// best-effort — the startup error stays the one reported.
fn discard_failed_container(pid: Pid, registry: &Registry, name: &str, workspace: &Workspace) {
    if let Err(e) = launcher::wait(pid) {
        tracing::warn!(pid = pid.as_raw(), error = %e, "failed to reap aborted container");
    }
    if let Err(e) = registry.delete(name) {
        tracing::warn!(name, error = %e, "failed to delete record of aborted container");
    }
    if let Err(e) = workspace.teardown() {
        tracing::warn!(name, error = %e, "failed to tear down workspace of aborted container");
    }
}
