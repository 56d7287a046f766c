//! System-wide constants and default paths.

/// Application name used in CLI output and on-disk directory names.
pub const APP_NAME: &str = "minibox";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "mbx";

/// Runtime state directory holding one subdirectory per container name.
pub const RUN_DIR: &str = "/var/run/minibox";

/// Data directory holding the base layer cache and per-container workspaces.
pub const DATA_DIR: &str = "/var/lib/minibox";

/// File name of the per-container registry record inside its directory.
pub const CONFIG_NAME: &str = "config.json";

/// Base image tarball expected under [`DATA_DIR`].
pub const BASE_IMAGE_TAR: &str = "busybox.tar";

/// Directory name of the shared read-only base layer under [`DATA_DIR`].
pub const BASE_LAYER_DIR: &str = "busybox";

/// Subdirectory of [`DATA_DIR`] holding per-container workspaces.
pub const CONTAINERS_DIR: &str = "containers";

/// Subdirectory of [`DATA_DIR`] where committed images are written.
pub const IMAGES_DIR: &str = "images";

/// Reserved first argument that routes the re-exec'd binary into the init
/// handler instead of normal command dispatch.
pub const INIT_SENTINEL: &str = "init";

/// Fixed descriptor slot at which the command channel's read end is
/// inherited by the container process (first slot after stdio).
pub const COMMAND_FD: i32 = 3;

/// Path the launcher re-execs to reach its own binary inside the child.
pub const SELF_EXE: &str = "/proc/self/exe";

/// Mount-table pseudo-file scanned to locate cgroup subsystem roots.
pub const MOUNTINFO_PATH: &str = "/proc/self/mountinfo";

/// Prefix for per-container cgroup group labels.
pub const CGROUP_PREFIX: &str = "minibox-";

/// `chrono` format string for registry `createTime` values.
pub const CREATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
