//! `mbx ps` — list containers known to the registry.

use clap::Args;
use minibox_runtime::registry::Registry;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {}

/// Executes the `ps` command, printing one row per registry record.
///
/// # Errors
///
/// Returns an error if the registry directory cannot be read.
#[allow(clippy::print_stdout)]
pub fn execute(_args: &PsArgs) -> anyhow::Result<()> {
    let registry = Registry::open();
    let records = registry.list()?;

    println!(
        "{:<12} {:<14} {:<8} {:<9} {:<20} {}",
        "ID", "NAME", "PID", "STATUS", "COMMAND", "CREATED"
    );
    for record in records {
        println!(
            "{:<12} {:<14} {:<8} {:<9} {:<20} {}",
            record.id, record.name, record.pid, record.status, record.command, record.create_time
        );
    }
    Ok(())
}
