//! # mbx — minibox CLI
//!
//! Minimal container runtime: launches a command into fresh namespaces
//! with cgroup limits and a layered root filesystem.

mod commands;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    // The re-exec sentinel is dispatched before logging or argument
    // parsing: the cloned child must reach the init handler no matter what
    // the normal CLI surface looks like.
    if commands::init::is_init_invocation(std::env::args().nth(1).as_deref()) {
        return commands::init::execute();
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
