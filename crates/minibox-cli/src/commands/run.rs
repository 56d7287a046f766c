//! `mbx run` — create and start a container.

use clap::Args;
use minibox_common::types::ResourceConfig;
use minibox_runtime::run::RunOptions;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Attach the container's stdio to this terminal and wait for it.
    #[arg(short = 'i', long, conflicts_with = "detach")]
    pub interactive: bool,

    /// Run detached: return immediately after the container starts.
    #[arg(short = 'd', long)]
    pub detach: bool,

    /// Memory limit written to the memory controller (e.g. `100m`).
    #[arg(short = 'm', long)]
    pub memory: Option<String>,

    /// CPU share weight written to the cpu controller (e.g. `512`).
    #[arg(short = 'c', long = "cpu-share")]
    pub cpu_share: Option<String>,

    /// CPU set written to the cpuset controller (e.g. `0-1`).
    #[arg(long = "cpuset")]
    pub cpu_set: Option<String>,

    /// Bind a host directory into the container (`host:container`).
    #[arg(short = 'v', long)]
    pub volume: Option<String>,

    /// Container name; defaults to the generated id.
    #[arg(long)]
    pub name: Option<String>,

    /// Command to run inside the container.
    #[arg(required = true, trailing_var_arg = true)]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the container fails to start or, in attached mode,
/// fails to clean up.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let options = RunOptions {
        interactive: args.interactive,
        detach: args.detach,
        resources: ResourceConfig {
            memory_limit: args.memory,
            cpu_share: args.cpu_share,
            cpu_set: args.cpu_set,
        },
        volume: args.volume,
        name: args.name,
    };
    minibox_runtime::run::run(&args.command, &options).map_err(anyhow::Error::from)
}
