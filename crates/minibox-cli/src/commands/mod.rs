//! CLI command definitions and dispatch.

pub mod commit;
pub mod init;
pub mod ps;
pub mod run;

use clap::{Parser, Subcommand};

/// minibox — minimal namespace/cgroup/overlay container runtime.
#[derive(Parser, Debug)]
#[command(name = "mbx", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and start a container.
    Run(run::RunArgs),
    /// Archive a container's mount point as an image tarball.
    Commit(commit::CommitArgs),
    /// List containers known to the registry.
    Ps(ps::PsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::Commit(args) => commit::execute(&args),
        Command::Ps(args) => ps::execute(&args),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn run_parses_flags_and_command() {
        let cli = Cli::try_parse_from([
            "mbx", "run", "-i", "-m", "100m", "--cpuset", "0-1", "--name", "web", "sh", "-c", "ls",
        ])
        .expect("parse");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.interactive);
        assert!(!args.detach);
        assert_eq!(args.memory.as_deref(), Some("100m"));
        assert_eq!(args.cpu_set.as_deref(), Some("0-1"));
        assert_eq!(args.name.as_deref(), Some("web"));
        assert_eq!(args.command, vec!["sh", "-c", "ls"]);
    }

    #[test]
    fn run_rejects_interactive_with_detach() {
        assert!(Cli::try_parse_from(["mbx", "run", "-i", "-d", "sh"]).is_err());
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["mbx", "run", "-i"]).is_err());
    }

    #[test]
    fn commit_takes_container_and_image() {
        let cli = Cli::try_parse_from(["mbx", "commit", "web", "snapshot"]).expect("parse");
        let Command::Commit(args) = cli.command else {
            panic!("expected commit");
        };
        assert_eq!(args.container, "web");
        assert_eq!(args.image, "snapshot");
    }
}
