//! Per-container workspace: layered root construction and teardown.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data>/busybox.tar               base image tarball (input)
//! <data>/busybox/                  shared read-only base layer (cache)
//! <data>/containers/<id>/upper/    writable layer, fresh per run
//! <data>/containers/<id>/work/     overlay scratch directory
//! <data>/containers/<id>/merged/   union mount point
//! ```
//!
//! The base layer is extracted at most once and survives teardown; every
//! other directory is created per container and deleted with it.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use minibox_common::constants::{BASE_IMAGE_TAR, BASE_LAYER_DIR, CONTAINERS_DIR, DATA_DIR};
use minibox_common::error::{MiniboxError, Result};

use super::overlay::{self, UnionConfig};
use super::volume::{self, Volume};

/// Gzip stream magic bytes; base tarballs may be plain or gzip-compressed.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The layered root filesystem of one container.
#[derive(Debug, Clone)]
pub struct Workspace {
    data_dir: PathBuf,
    container_dir: PathBuf,
    volume: Option<Volume>,
}

impl Workspace {
    /// Creates a workspace for a container id under the default data
    /// directory.
    #[must_use]
    pub fn new(container_id: &str, volume: Option<Volume>) -> Self {
        Self::rooted_at(DATA_DIR, container_id, volume)
    }

    /// Creates a workspace under an explicit data directory. Test seam.
    #[must_use]
    pub fn rooted_at(data_dir: impl Into<PathBuf>, container_id: &str, volume: Option<Volume>) -> Self {
        let data_dir = data_dir.into();
        let container_dir = data_dir.join(CONTAINERS_DIR).join(container_id);
        Self {
            data_dir,
            container_dir,
            volume,
        }
    }

    /// The base image tarball this workspace extracts its read-only layer from.
    #[must_use]
    pub fn base_tar(&self) -> PathBuf {
        self.data_dir.join(BASE_IMAGE_TAR)
    }

    /// The shared read-only base layer directory.
    #[must_use]
    pub fn base_layer(&self) -> PathBuf {
        self.data_dir.join(BASE_LAYER_DIR)
    }

    /// The per-container writable layer.
    #[must_use]
    pub fn write_layer(&self) -> PathBuf {
        self.container_dir.join("upper")
    }

    /// The overlay scratch directory.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.container_dir.join("work")
    }

    /// The union mount point — the container's root-to-be.
    #[must_use]
    pub fn mount_point(&self) -> PathBuf {
        self.container_dir.join("merged")
    }

    /// The optional bind volume.
    #[must_use]
    pub const fn volume(&self) -> Option<&Volume> {
        self.volume.as_ref()
    }

    /// Builds the layered root: base layer (cached), fresh write layer,
    /// union mount, then the optional volume bind nested inside it.
    ///
    /// # Errors
    ///
    /// Propagates the first failing step; no partial-success masking.
    pub fn prepare(&self) -> Result<()> {
        let _ = self.ensure_base_layer()?;
        self.create_write_layer()?;
        overlay::mount_union(&UnionConfig {
            lower_dir: self.base_layer(),
            upper_dir: self.write_layer(),
            work_dir: self.work_dir(),
            merged_dir: self.mount_point(),
        })?;
        if let Some(volume) = &self.volume {
            volume::mount_volume(volume, &self.mount_point())?;
        }
        Ok(())
    }

    /// Ensures the read-only base layer exists, extracting the base tarball
    /// only when the directory is absent. Returns whether an extraction ran.
    ///
    /// Never re-extracts into an existing layer — the existence check is
    /// what makes the layer a reusable cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the tarball is missing or unpacking fails.
    pub fn ensure_base_layer(&self) -> Result<bool> {
        let layer = self.base_layer();
        if layer.exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(&layer).map_err(|e| MiniboxError::io(&layer, e))?;
        let reader = open_archive(&self.base_tar())?;
        tar::Archive::new(reader)
            .unpack(&layer)
            .map_err(|e| MiniboxError::io(&layer, e))?;
        tracing::info!(layer = %layer.display(), "base layer extracted");
        Ok(true)
    }

    /// Creates the fresh writable layer; an already-existing layer is an
    /// error, because by construction no previous run may have left one.
    fn create_write_layer(&self) -> Result<()> {
        std::fs::create_dir_all(&self.container_dir)
            .map_err(|e| MiniboxError::io(&self.container_dir, e))?;
        let upper = self.write_layer();
        std::fs::create_dir(&upper).map_err(|e| MiniboxError::io(&upper, e))?;
        Ok(())
    }

    /// Tears the workspace down: volume unmount first (it is nested inside
    /// the union), then the union itself, then the mount point and write
    /// layer directories. The base layer is never touched.
    ///
    /// # Errors
    ///
    /// Propagates the first failing step; stale directories or mounts left
    /// behind by a failure require external cleanup.
    pub fn teardown(&self) -> Result<()> {
        if let Some(volume) = &self.volume {
            volume::unmount_volume(volume, &self.mount_point())?;
        }
        overlay::unmount_union(&self.mount_point())?;
        let merged = self.mount_point();
        std::fs::remove_dir_all(&merged).map_err(|e| MiniboxError::io(&merged, e))?;
        let upper = self.write_layer();
        std::fs::remove_dir_all(&upper).map_err(|e| MiniboxError::io(&upper, e))?;
        let work = self.work_dir();
        if work.exists() {
            std::fs::remove_dir_all(&work).map_err(|e| MiniboxError::io(&work, e))?;
        }
        std::fs::remove_dir(&self.container_dir)
            .map_err(|e| MiniboxError::io(&self.container_dir, e))?;
        tracing::info!(container_dir = %self.container_dir.display(), "workspace removed");
        Ok(())
    }
}

/// Opens a base tarball, transparently decompressing gzip streams.
fn open_archive(path: &Path) -> Result<Box<dyn Read>> {
    let mut file = std::fs::File::open(path).map_err(|e| MiniboxError::io(path, e))?;
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic).map_err(|e| MiniboxError::io(path, e))?;
    let _ = file
        .seek(SeekFrom::Start(0))
        .map_err(|e| MiniboxError::io(path, e))?;
    if n == magic.len() && magic == GZIP_MAGIC {
        Ok(Box::new(flate2::read::GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// Writes a one-file tarball at `tar_path` containing `etc/os-release`.
    fn write_base_tar(tar_path: &Path, gzip: bool) {
        let file = std::fs::File::create(tar_path).expect("create tar");
        let writer: Box<dyn std::io::Write> = if gzip {
            Box::new(flate2::write::GzEncoder::new(
                file,
                flate2::Compression::default(),
            ))
        } else {
            Box::new(file)
        };
        let mut builder = tar::Builder::new(writer);
        let data = b"NAME=minibase\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "etc/os-release", &data[..])
            .expect("append");
        builder.into_inner().expect("finish").flush().expect("flush");
    }

    fn workspace_in(dir: &Path) -> Workspace {
        Workspace::rooted_at(dir, "0123456789", None)
    }

    #[test]
    fn base_layer_extracts_once_and_is_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = workspace_in(dir.path());
        write_base_tar(&workspace.base_tar(), false);

        assert!(workspace.ensure_base_layer().expect("first"));
        let marker = workspace.base_layer().join("marker");
        std::fs::write(&marker, "kept").expect("marker");

        // Second call must not extract and must leave the layer untouched.
        assert!(!workspace.ensure_base_layer().expect("second"));
        assert_eq!(std::fs::read_to_string(&marker).expect("marker"), "kept");
        assert_eq!(
            std::fs::read_to_string(workspace.base_layer().join("etc/os-release"))
                .expect("extracted file"),
            "NAME=minibase\n"
        );
    }

    #[test]
    fn base_layer_accepts_gzip_compressed_tarballs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = workspace_in(dir.path());
        write_base_tar(&workspace.base_tar(), true);

        assert!(workspace.ensure_base_layer().expect("extract"));
        assert!(workspace.base_layer().join("etc/os-release").is_file());
    }

    #[test]
    fn missing_base_tar_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = workspace_in(dir.path());
        assert!(workspace.ensure_base_layer().is_err());
    }

    #[test]
    fn write_layer_must_be_fresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = workspace_in(dir.path());
        workspace.create_write_layer().expect("first");
        assert!(workspace.write_layer().is_dir());
        assert!(workspace.create_write_layer().is_err());
    }

    #[test]
    fn workspaces_of_different_containers_are_disjoint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = Workspace::rooted_at(dir.path(), "aaaaaaaaaa", None);
        let b = Workspace::rooted_at(dir.path(), "bbbbbbbbbb", None);
        assert_ne!(a.mount_point(), b.mount_point());
        assert_ne!(a.write_layer(), b.write_layer());
        // The base layer cache is shared on purpose.
        assert_eq!(a.base_layer(), b.base_layer());
    }
}
