//! Union mounts for layered container filesystems.
//!
//! Overlays one writable upper layer on a read-only lower layer: writes land
//! only in the upper layer and reads prefer the upper layer's version of a
//! path, falling back to the lower layer.

use std::path::{Path, PathBuf};

use minibox_common::error::{MiniboxError, Result};

/// Configuration for a union mount.
#[derive(Debug, Clone)]
pub struct UnionConfig {
    /// Read-only lower layer (the shared base).
    pub lower_dir: PathBuf,
    /// Writable upper layer, created fresh per container.
    pub upper_dir: PathBuf,
    /// Scratch directory required by the overlay filesystem; must live on
    /// the same filesystem as the upper layer.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

/// Mounts the union with the given configuration.
///
/// Creates the work and merged directories if they do not exist, then issues
/// the `mount(2)` syscall with overlay-specific options.
///
/// # Errors
///
/// Returns an error if directory creation fails or if the mount syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_union(config: &UnionConfig) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    std::fs::create_dir_all(&config.work_dir).map_err(|e| MiniboxError::io(&config.work_dir, e))?;
    std::fs::create_dir_all(&config.merged_dir)
        .map_err(|e| MiniboxError::io(&config.merged_dir, e))?;

    let opts = format!(
        "lowerdir={},upperdir={},workdir={}",
        config.lower_dir.display(),
        config.upper_dir.display(),
        config.work_dir.display()
    );

    mount(
        Some("overlay"),
        &config.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| MiniboxError::Mount {
        operation: "overlay",
        path: config.merged_dir.clone(),
        source: e.into(),
    })?;

    tracing::info!(merged = %config.merged_dir.display(), "union mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — union mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_union(config: &UnionConfig) -> Result<()> {
    Err(MiniboxError::Mount {
        operation: "overlay",
        path: config.merged_dir.clone(),
        source: std::io::Error::other("Linux required for union mounts"),
    })
}

/// Unmounts the union at the given mount point.
///
/// Uses `MNT_DETACH` to lazily detach the filesystem.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
#[cfg(target_os = "linux")]
pub fn unmount_union(merged_dir: &Path) -> Result<()> {
    nix::mount::umount2(merged_dir, nix::mount::MntFlags::MNT_DETACH).map_err(|e| {
        MiniboxError::Mount {
            operation: "umount-overlay",
            path: merged_dir.to_path_buf(),
            source: e.into(),
        }
    })?;
    tracing::info!(path = %merged_dir.display(), "union unmounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — union unmounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn unmount_union(merged_dir: &Path) -> Result<()> {
    Err(MiniboxError::Mount {
        operation: "umount-overlay",
        path: merged_dir.to_path_buf(),
        source: std::io::Error::other("Linux required for union mounts"),
    })
}
