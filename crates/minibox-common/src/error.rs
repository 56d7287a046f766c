//! Unified error types for the minibox workspace.
//!
//! Every fallible operation in the workspace returns [`Result`]. Variants
//! carry enough context (path, mount step, subsystem) that the first error
//! logged at the top level identifies the failing kernel operation — there
//! is no partial-success reporting anywhere in the runtime.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum MiniboxError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value or argument is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A mount, unmount, or pivot_root operation failed.
    ///
    /// `operation` names the failing step so that mount-sequence failures
    /// inside the init path stay distinguishable from one another.
    #[error("mount operation '{operation}' failed at {path}: {source}")]
    Mount {
        /// The mount step that failed (e.g. `overlay`, `pivot_root`, `proc`).
        operation: &'static str,
        /// Target path of the operation.
        path: PathBuf,
        /// Underlying errno.
        source: std::io::Error,
    },

    /// A cgroup subsystem operation failed.
    #[error("cgroup subsystem '{subsystem}': {message}")]
    Cgroup {
        /// Name of the subsystem (memory, cpu, cpuset).
        subsystem: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Spawning the container process (pipe or clone) failed.
    #[error("failed to spawn container process: {message}")]
    Spawn {
        /// Description of the failure.
        message: String,
    },

    /// The command channel pipe could not be created, written, or read.
    #[error("command channel error: {message}")]
    Channel {
        /// Description of the failure.
        message: String,
    },

    /// The command read from the command channel was empty.
    #[error("no command received on the command channel")]
    EmptyCommand,

    /// The command's first token could not be resolved on PATH.
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The unresolvable command token.
        command: String,
    },

    /// Replacing the process image with the workload failed.
    #[error("exec of {command} failed: {source}")]
    Exec {
        /// Resolved executable path.
        command: PathBuf,
        /// Underlying errno.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl MiniboxError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MiniboxError>;
