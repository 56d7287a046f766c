//! Image commit: archive a container's mount point.
//!
//! Produces a gzip-compressed tarball named `<image>.tar` under the data
//! directory's image store, capturing the merged view of the container's
//! layered root at the moment of the call.

use std::path::{Path, PathBuf};

use minibox_common::constants::{DATA_DIR, IMAGES_DIR};
use minibox_common::error::{MiniboxError, Result};
use minibox_core::filesystem::Workspace;

use crate::registry::Registry;

/// Commits a named container's mount point as an image tarball, returning
/// the path of the written archive.
///
/// # Errors
///
/// Returns an error if the container has no registry record or the archive
/// cannot be written.
pub fn commit_container(registry: &Registry, container_name: &str, image_name: &str) -> Result<PathBuf> {
    let record = registry.get(container_name)?;
    let workspace = Workspace::new(&record.id, None);
    let images_dir = Path::new(DATA_DIR).join(IMAGES_DIR);
    std::fs::create_dir_all(&images_dir).map_err(|e| MiniboxError::io(&images_dir, e))?;
    let output = images_dir.join(format!("{image_name}.tar"));
    archive_mount_point(&workspace.mount_point(), &output)?;
    Ok(output)
}

/// Writes the full contents of `mount_point` into a gzip-compressed tar
/// archive at `output`, with paths relative to the mount point.
///
/// # Errors
///
/// Returns an error if the mount point cannot be read or the archive write
/// fails.
pub fn archive_mount_point(mount_point: &Path, output: &Path) -> Result<()> {
    use std::io::Write;

    let file = std::fs::File::create(output).map_err(|e| MiniboxError::io(output, e))?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", mount_point)
        .map_err(|e| MiniboxError::io(mount_point, e))?;
    let encoder = builder.into_inner().map_err(|e| MiniboxError::io(output, e))?;
    let mut file = encoder.finish().map_err(|e| MiniboxError::io(output, e))?;
    file.flush().map_err(|e| MiniboxError::io(output, e))?;

    tracing::info!(mount_point = %mount_point.display(), image = %output.display(), "image committed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn archive_captures_mount_point_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mount = dir.path().join("merged");
        std::fs::create_dir_all(mount.join("etc")).expect("mkdir");
        std::fs::write(mount.join("etc/hostname"), "boxed\n").expect("write");

        let output = dir.path().join("snap.tar");
        archive_mount_point(&mount, &output).expect("archive");

        let file = std::fs::File::open(&output).expect("open");
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
        let mut found = false;
        for entry in archive.entries().expect("entries") {
            let mut entry = entry.expect("entry");
            if entry.path().expect("path").ends_with("etc/hostname") {
                let mut contents = String::new();
                let _ = entry.read_to_string(&mut contents).expect("read");
                assert_eq!(contents, "boxed\n");
                found = true;
            }
        }
        assert!(found, "archive must contain etc/hostname");
    }

    #[test]
    fn committing_an_unknown_container_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Registry::rooted_at(dir.path());
        assert!(commit_container(&registry, "ghost", "snap").is_err());
    }
}
