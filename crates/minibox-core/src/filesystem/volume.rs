//! Host-directory bind volumes.
//!
//! A volume makes a host path available inside the container's mount point;
//! its contents outlive the writable layer's deletion.

use std::path::{Path, PathBuf};

use minibox_common::error::{MiniboxError, Result};

/// A parsed `host:container` volume specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Host directory to expose (created if missing).
    pub host_dir: PathBuf,
    /// Path inside the container, relative to the mount point.
    pub container_rel: String,
}

impl Volume {
    /// Parses a `host:container` spec; both halves must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec does not split into exactly two
    /// non-empty parts.
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        match parts.as_slice() {
            [host, container] if !host.is_empty() && !container.is_empty() => Ok(Self {
                host_dir: PathBuf::from(host),
                container_rel: (*container).to_owned(),
            }),
            _ => Err(MiniboxError::Config {
                message: format!("volume spec '{spec}' is not of the form host:container"),
            }),
        }
    }

    /// Resolves the volume's target path inside a mount point.
    ///
    /// The container half is always interpreted relative to the mount point,
    /// even when written with a leading slash.
    #[must_use]
    pub fn target_in(&self, mount_point: &Path) -> PathBuf {
        mount_point.join(self.container_rel.trim_start_matches('/'))
    }
}

/// Bind-mounts the volume's host directory inside the mount point.
///
/// Ensures the host directory exists (creating it if missing) and creates
/// the target directory inside the mount point before issuing the bind.
///
/// # Errors
///
/// Returns an error if directory creation or the mount syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_volume(volume: &Volume, mount_point: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    std::fs::create_dir_all(&volume.host_dir).map_err(|e| MiniboxError::io(&volume.host_dir, e))?;
    let target = volume.target_in(mount_point);
    std::fs::create_dir_all(&target).map_err(|e| MiniboxError::io(&target, e))?;

    mount(
        Some(&volume.host_dir),
        &target,
        None::<&str>,
        MsFlags::MS_BIND,
        None::<&str>,
    )
    .map_err(|e| MiniboxError::Mount {
        operation: "volume-bind",
        path: target.clone(),
        source: e.into(),
    })?;

    tracing::info!(host = %volume.host_dir.display(), target = %target.display(), "volume mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — bind mounts require Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_volume(volume: &Volume, mount_point: &Path) -> Result<()> {
    Err(MiniboxError::Mount {
        operation: "volume-bind",
        path: volume.target_in(mount_point),
        source: std::io::Error::other("Linux required for bind mounts"),
    })
}

/// Unmounts the volume bind inside the mount point.
///
/// Must run before the union mount itself is torn down — the bind is nested
/// inside it.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
#[cfg(target_os = "linux")]
pub fn unmount_volume(volume: &Volume, mount_point: &Path) -> Result<()> {
    let target = volume.target_in(mount_point);
    nix::mount::umount2(&target, nix::mount::MntFlags::MNT_DETACH).map_err(|e| {
        MiniboxError::Mount {
            operation: "umount-volume",
            path: target.clone(),
            source: e.into(),
        }
    })?;
    tracing::info!(target = %target.display(), "volume unmounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — bind mounts require Linux.
#[cfg(not(target_os = "linux"))]
pub fn unmount_volume(volume: &Volume, mount_point: &Path) -> Result<()> {
    Err(MiniboxError::Mount {
        operation: "umount-volume",
        path: volume.target_in(mount_point),
        source: std::io::Error::other("Linux required for bind mounts"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_two_part_spec() {
        let volume = Volume::parse("/data:/mnt/data").expect("parse");
        assert_eq!(volume.host_dir, PathBuf::from("/data"));
        assert_eq!(volume.container_rel, "/mnt/data");
    }

    #[test]
    fn parse_rejects_malformed_specs() {
        for spec in ["", "/data", ":/mnt", "/data:", "a:b:c"] {
            assert!(Volume::parse(spec).is_err(), "spec '{spec}' must be rejected");
        }
    }

    #[test]
    fn target_is_always_inside_the_mount_point() {
        let volume = Volume::parse("/data:/mnt/data").expect("parse");
        assert_eq!(
            volume.target_in(Path::new("/var/lib/minibox/containers/1/merged")),
            PathBuf::from("/var/lib/minibox/containers/1/merged/mnt/data")
        );
    }
}
