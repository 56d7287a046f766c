//! Root switching via `pivot_root(2)`.
//!
//! The whole sequence — recursive self bind mount, hidden staging directory,
//! pivot, lazy unmount and removal of the old root — is exposed as a single
//! "commit root" operation. The staging directory is owned by a guard so it
//! is cleaned up on every exit path, including a failed pivot.

use std::path::{Path, PathBuf};

use minibox_common::error::Result;

/// Hidden directory under the new root where the old root is parked.
const STAGING_DIR: &str = ".old_root";

/// Removes the staging directory on drop unless [`Staging::remove`] already
/// consumed it.
struct Staging {
    path: PathBuf,
    armed: bool,
}

impl Staging {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Explicit removal with error reporting; disarms the drop fallback.
    fn remove(mut self) -> std::io::Result<()> {
        self.armed = false;
        std::fs::remove_dir(&self.path)
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_dir(&self.path);
        }
    }
}

/// Makes `new_root` the process root filesystem.
///
/// Sequence, in required order:
/// 1. recursively bind-mount `new_root` onto itself, making it a mount
///    point independent of its parent mount (a `pivot_root` precondition);
/// 2. create the hidden staging directory under the new root;
/// 3. `pivot_root(2)`, relocating the previous root under the staging
///    directory;
/// 4. `chdir("/")`;
/// 5. lazily detach the staging mount and remove the now-empty directory.
///
/// Each step's failure is fatal; the staging directory never survives an
/// exit from this function.
///
/// # Errors
///
/// Returns an error naming the failing step: `bind-self`, `pivot_root`,
/// `chdir`, `umount-old-root`, or the staging directory removal.
#[cfg(target_os = "linux")]
pub fn commit_root(new_root: &Path) -> Result<()> {
    use minibox_common::error::MiniboxError;
    use nix::mount::{MntFlags, MsFlags, mount, umount2};
    use nix::unistd;

    mount(
        Some(new_root),
        new_root,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| MiniboxError::Mount {
        operation: "bind-self",
        path: new_root.to_path_buf(),
        source: e.into(),
    })?;

    let staging_path = new_root.join(STAGING_DIR);
    std::fs::create_dir_all(&staging_path).map_err(|e| MiniboxError::io(&staging_path, e))?;
    let mut staging = Staging::new(staging_path.clone());

    unistd::pivot_root(new_root, &staging_path).map_err(|e| MiniboxError::Mount {
        operation: "pivot_root",
        path: new_root.to_path_buf(),
        source: e.into(),
    })?;

    // The old root now lives at /.old_root inside the switched namespace.
    staging.path = Path::new("/").join(STAGING_DIR);

    unistd::chdir("/").map_err(|e| MiniboxError::Mount {
        operation: "chdir",
        path: PathBuf::from("/"),
        source: e.into(),
    })?;

    umount2(&staging.path, MntFlags::MNT_DETACH).map_err(|e| MiniboxError::Mount {
        operation: "umount-old-root",
        path: staging.path.clone(),
        source: e.into(),
    })?;

    let staging_path = staging.path.clone();
    staging
        .remove()
        .map_err(|e| MiniboxError::io(staging_path, e))?;

    tracing::info!(root = %new_root.display(), "root committed");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — `pivot_root(2)` requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn commit_root(new_root: &Path) -> Result<()> {
    Err(minibox_common::error::MiniboxError::Mount {
        operation: "pivot_root",
        path: new_root.to_path_buf(),
        source: std::io::Error::other("Linux required for pivot_root"),
    })
}
