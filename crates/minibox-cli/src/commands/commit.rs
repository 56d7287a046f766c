//! `mbx commit` — archive a container's mount point as an image.

use clap::Args;
use minibox_runtime::commit::commit_container;
use minibox_runtime::registry::Registry;

/// Arguments for the `commit` command.
#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Name of the container to snapshot.
    pub container: String,

    /// Image name; the archive is written as `<image>.tar`.
    pub image: String,
}

/// Executes the `commit` command.
///
/// # Errors
///
/// Returns an error if the container is unknown or archiving fails.
#[allow(clippy::print_stdout)]
pub fn execute(args: &CommitArgs) -> anyhow::Result<()> {
    let registry = Registry::open();
    let output = commit_container(&registry, &args.container, &args.image)?;
    println!("{}", output.display());
    Ok(())
}
