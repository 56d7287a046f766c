//! Process and namespace launcher.
//!
//! Spawns the container process with `clone(2)`, creating its UTS, PID,
//! mount, network, and IPC namespaces atomically with the spawn. The child
//! immediately re-execs the runtime's own binary with the reserved `init`
//! sentinel argument, so the to-be-isolated process becomes its namespace's
//! PID 1 running our init handler — no second executable to ship.
//!
//! The command channel's read end is inherited at the fixed descriptor slot
//! `COMMAND_FD`; the parent keeps the write end and returns without waiting
//! for the child. Both channel ends are close-on-exec, so the child's
//! inherited copy of the write end is gone once it re-execs — the only open
//! writer after the handoff is the parent's sink, and closing it is what
//! delivers EOF to the init handler.

use minibox_common::error::Result;
use minibox_core::filesystem::Workspace;
use minibox_core::namespace::NamespaceConfig;
use nix::unistd::Pid;

use crate::pipe::CommandSink;

/// Stack size handed to `clone(2)` for the child's entry trampoline.
#[cfg(target_os = "linux")]
const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Spawns the container process.
///
/// Order matters: the command channel is created first (failure aborts with
/// no process spawned), then the child is cloned into fresh namespaces with
/// its working directory on the workspace's mount point. With
/// `attach_stdio` the child shares the caller's stdio; otherwise its stdio
/// is pointed at `/dev/null`.
///
/// Returns as soon as the kernel accepts the spawn; spawn and pipe errors
/// propagate verbatim and are never retried — namespace creation is not
/// idempotent.
///
/// # Errors
///
/// Returns an error if pipe creation or `clone(2)` fails.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub fn launch(
    workspace: &Workspace,
    namespaces: &NamespaceConfig,
    attach_stdio: bool,
) -> Result<(Pid, CommandSink)> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStringExt;

    use minibox_common::constants::{BIN_NAME, INIT_SENTINEL, SELF_EXE};
    use minibox_common::error::MiniboxError;

    let (source, sink) = crate::pipe::channel()?;

    let cwd = CString::new(workspace.mount_point().into_os_string().into_vec()).map_err(|_| {
        MiniboxError::Config {
            message: "mount point path contains a NUL byte".to_owned(),
        }
    })?;
    // Prepared in the parent so the child trampoline only calls raw libc.
    let exe = CString::new(SELF_EXE).map_err(|_| MiniboxError::Config {
        message: "self-exe path contains a NUL byte".to_owned(),
    })?;
    let argv0 = CString::new(BIN_NAME).map_err(|_| MiniboxError::Config {
        message: "binary name contains a NUL byte".to_owned(),
    })?;
    let sentinel = CString::new(INIT_SENTINEL).map_err(|_| MiniboxError::Config {
        message: "sentinel contains a NUL byte".to_owned(),
    })?;

    let read_fd = source.raw_fd();
    let mut stack = vec![0u8; CHILD_STACK_SIZE];
    let child = Box::new(|| child_entry(read_fd, &cwd, &exe, &argv0, &sentinel, attach_stdio));

    // SAFETY: the child trampoline only moves descriptors, changes
    // directory, and execs; it touches no locks or shared state from the
    // parent's address space.
    let pid = unsafe {
        nix::sched::clone(
            child,
            &mut stack,
            namespaces.clone_flags(),
            Some(nix::sys::signal::Signal::SIGCHLD as i32),
        )
    }
    .map_err(|e| MiniboxError::Spawn {
        message: format!("clone failed: {e}"),
    })?;

    // Parent's copy of the read end closes here; the child keeps its own.
    drop(source);

    tracing::info!(pid = pid.as_raw(), attach_stdio, "container process spawned");
    Ok((pid, sink))
}

/// Runs inside the cloned child between `clone(2)` and `exec`: wires the
/// command channel to its fixed slot, detaches stdio when requested, enters
/// the workspace mount point, and replaces itself with `/proc/self/exe
/// init`. Only reached again if exec fails.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
fn child_entry(
    read_fd: std::os::fd::RawFd,
    cwd: &std::ffi::CStr,
    exe: &std::ffi::CStr,
    argv0: &std::ffi::CStr,
    sentinel: &std::ffi::CStr,
    attach_stdio: bool,
) -> isize {
    use minibox_common::constants::COMMAND_FD;

    // SAFETY: raw descriptor and exec plumbing on descriptors this process
    // owns; all pointers come from CStrs that outlive the calls.
    unsafe {
        // Both channel ends are close-on-exec. The read end must survive
        // the re-exec: dup2 clears the flag on the new descriptor, and the
        // already-in-place case clears it by hand. The inherited write end
        // is left alone and dies with the exec, preserving EOF for the
        // init handler's read.
        if read_fd == COMMAND_FD {
            if libc::fcntl(read_fd, libc::F_SETFD, 0) < 0 {
                return 1;
            }
        } else {
            if libc::dup2(read_fd, COMMAND_FD) < 0 {
                return 1;
            }
            let _ = libc::close(read_fd);
        }

        if !attach_stdio {
            let null = libc::open(c"/dev/null".as_ptr(), libc::O_RDWR);
            if null < 0 {
                return 1;
            }
            for fd in 0..=2 {
                if libc::dup2(null, fd) < 0 {
                    return 1;
                }
            }
            if null > 2 {
                let _ = libc::close(null);
            }
        }

        if libc::chdir(cwd.as_ptr()) < 0 {
            return 1;
        }

        let argv = [argv0.as_ptr(), sentinel.as_ptr(), std::ptr::null()];
        let _ = libc::execv(exe.as_ptr(), argv.as_ptr());
    }
    // exec only returns on failure.
    127
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — namespace creation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn launch(
    _workspace: &Workspace,
    _namespaces: &NamespaceConfig,
    _attach_stdio: bool,
) -> Result<(Pid, CommandSink)> {
    Err(minibox_common::error::MiniboxError::Spawn {
        message: "Linux required to launch containers".to_owned(),
    })
}

/// Blocks until the container process terminates and returns its raw wait
/// status.
///
/// # Errors
///
/// Returns an error if `waitpid(2)` fails.
pub fn wait(pid: Pid) -> Result<nix::sys::wait::WaitStatus> {
    nix::sys::wait::waitpid(pid, None).map_err(|e| minibox_common::error::MiniboxError::Spawn {
        message: format!("waitpid({pid}) failed: {e}"),
    })
}
