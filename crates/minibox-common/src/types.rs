//! Domain primitive types used across the minibox workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a container instance.
///
/// Rendered as a 10-character numeric string, which doubles as the default
/// container name when the caller does not supply one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Length of a generated identifier, in decimal digits.
    pub const LEN: usize = 10;

    /// Creates a container ID from an existing string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random numeric container ID.
    #[must_use]
    pub fn generate() -> Self {
        let id = uuid::Uuid::new_v4()
            .as_bytes()
            .iter()
            .take(Self::LEN)
            .map(|b| char::from(b'0' + b % 10))
            .collect();
        Self(id)
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource limits requested for a container.
///
/// Each field holds the raw string written into the corresponding cgroup
/// control file (e.g. `100m`, `512`, `0-1`). `None` means "do not constrain
/// this dimension" and the matching controller performs no writes at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Memory limit, written to `memory.limit_in_bytes`.
    pub memory_limit: Option<String>,
    /// CPU share weight, written to `cpu.shares`.
    pub cpu_share: Option<String>,
    /// CPU set specification, written to `cpuset.cpus`.
    pub cpu_set: Option<String>,
}

impl ResourceConfig {
    /// Returns `true` if no dimension is constrained.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.memory_limit.is_none() && self.cpu_share.is_none() && self.cpu_set.is_none()
    }
}

/// Lifecycle status of a container as persisted in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Container process is running.
    Running,
    /// Container was stopped by an external action.
    Stopped,
    /// Container process exited on its own.
    Exited,
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

/// Persisted metadata record for a container, one JSON object per container
/// name under the registry directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Host PID of the container's init process, as a decimal string.
    pub pid: String,
    /// Generated container identifier.
    pub id: String,
    /// Container name; defaults to `id` when the caller supplied none.
    pub name: String,
    /// Space-joined command line the container was started with.
    pub command: String,
    /// Creation timestamp, local time.
    #[serde(rename = "createTime")]
    pub create_time: String,
    /// Current lifecycle status.
    pub status: ContainerStatus,
}

impl ContainerRecord {
    /// Builds a fresh `running` record for a just-spawned container.
    ///
    /// Defaults the name to the id when `name` is `None` or empty, and
    /// space-joins the command line (the same lossy framing the command
    /// channel uses).
    #[must_use]
    pub fn new(id: &ContainerId, pid: i32, command: &[String], name: Option<String>) -> Self {
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| id.as_str().to_owned());
        Self {
            pid: pid.to_string(),
            id: id.as_str().to_owned(),
            name,
            command: command.join(" "),
            create_time: chrono::Local::now()
                .format(crate::constants::CREATE_TIME_FORMAT)
                .to_string(),
            status: ContainerStatus::Running,
        }
    }
}
