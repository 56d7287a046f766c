//! Init handler — the container process's PID 1 path.
//!
//! Entered when the binary is re-exec'd with the reserved sentinel argument.
//! Reads the command from the inherited channel descriptor, resolves it on
//! PATH, commits the new root and the pseudo-filesystem mounts, then
//! replaces itself with the workload. Every step's failure is fatal; the
//! kernel tears the namespace down when PID 1 exits.

use std::path::PathBuf;

use minibox_common::constants::COMMAND_FD;
use minibox_common::error::{MiniboxError, Result};

/// Reads the full command string from the inherited descriptor slot and
/// parses it into an argument vector.
///
/// # Errors
///
/// Returns an error on read failure or an empty transmission.
#[allow(unsafe_code)]
fn read_command() -> Result<Vec<String>> {
    use std::io::Read;
    use std::os::fd::FromRawFd;

    // SAFETY: the launcher guarantees the channel's read end sits at
    // COMMAND_FD in the child, and nothing else owns it.
    let mut channel = unsafe { std::fs::File::from_raw_fd(COMMAND_FD) };
    let mut raw = String::new();
    let _ = channel
        .read_to_string(&mut raw)
        .map_err(|e| MiniboxError::Channel {
            message: format!("command read failed: {e}"),
        })?;
    crate::pipe::parse_received(&raw)
}

/// Resolves the command's first token to an absolute executable path with
/// shell-style PATH-search semantics.
///
/// # Errors
///
/// Returns [`MiniboxError::CommandNotFound`] if no executable matches.
pub fn resolve_command(token: &str) -> Result<PathBuf> {
    which::which(token).map_err(|_| MiniboxError::CommandNotFound {
        command: token.to_owned(),
    })
}

/// Commits the new root and mounts the pseudo filesystems, in required
/// order: pivot to the current working directory (the workspace mount
/// point), then `proc` at `/proc` with noexec/nosuid/nodev, then a tmpfs at
/// `/dev` with nosuid/strictatime and `mode=755`.
#[cfg(target_os = "linux")]
fn setup_mounts() -> Result<()> {
    use nix::mount::{MsFlags, mount};

    let cwd = std::env::current_dir().map_err(|e| MiniboxError::io("<cwd>", e))?;
    minibox_core::filesystem::pivot::commit_root(&cwd)?;

    mount(
        Some("proc"),
        "/proc",
        Some("proc"),
        MsFlags::MS_NOEXEC | MsFlags::MS_NOSUID | MsFlags::MS_NODEV,
        None::<&str>,
    )
    .map_err(|e| MiniboxError::Mount {
        operation: "proc",
        path: PathBuf::from("/proc"),
        source: e.into(),
    })?;

    mount(
        Some("tmpfs"),
        "/dev",
        Some("tmpfs"),
        MsFlags::MS_NOSUID | MsFlags::MS_STRICTATIME,
        Some("mode=755"),
    )
    .map_err(|e| MiniboxError::Mount {
        operation: "dev",
        path: PathBuf::from("/dev"),
        source: e.into(),
    })?;

    Ok(())
}

/// Replaces the process image with the resolved executable, passing the
/// full token vector as argv and keeping the inherited environment. The
/// pid is preserved; on success this never returns.
#[cfg(target_os = "linux")]
fn exec_workload(resolved: &std::path::Path, args: &[String]) -> Result<std::convert::Infallible> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let path = CString::new(resolved.as_os_str().as_bytes()).map_err(|_| MiniboxError::Config {
        message: format!("resolved path {} contains a NUL byte", resolved.display()),
    })?;
    let argv = args
        .iter()
        .map(|arg| {
            CString::new(arg.as_bytes()).map_err(|_| MiniboxError::Config {
                message: format!("argument '{arg}' contains a NUL byte"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    nix::unistd::execv(&path, &argv).map_err(|e| MiniboxError::Exec {
        command: resolved.to_path_buf(),
        source: e.into(),
    })
}

/// Runs the full init sequence. Never returns on success — the process
/// becomes the container workload.
///
/// # Errors
///
/// Returns the first fatal step failure: empty command, resolution failure,
/// a named mount/pivot failure, or exec failure.
#[cfg(target_os = "linux")]
pub fn run_init() -> Result<std::convert::Infallible> {
    let args = read_command()?;
    let resolved = resolve_command(&args[0])?;
    tracing::info!(command = %resolved.display(), "init resolved workload");
    setup_mounts()?;
    exec_workload(&resolved, &args)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — the init path requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn run_init() -> Result<std::convert::Infallible> {
    let _ = read_command()?;
    Err(MiniboxError::Spawn {
        message: "Linux required for the container init path".to_owned(),
    })
}
