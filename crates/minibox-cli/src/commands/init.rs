//! Internal re-exec entry point.
//!
//! Invoked when the process's first argument is the reserved sentinel; this
//! path performs only the init-handler sequence and never the normal launch
//! path. It is how the cloned child, re-exec'd from `/proc/self/exe`,
//! becomes its namespace's PID 1 running our setup code.

use minibox_common::constants::INIT_SENTINEL;

/// Returns whether the process was invoked as the re-exec init entry.
#[must_use]
pub fn is_init_invocation(first_arg: Option<&str>) -> bool {
    first_arg == Some(INIT_SENTINEL)
}

/// Runs the init handler. On success the process image is replaced by the
/// container workload and this function never returns.
///
/// # Errors
///
/// Returns the init handler's fatal error; the caller exits non-zero and
/// the kernel tears the namespaces down with this process.
pub fn execute() -> anyhow::Result<()> {
    match minibox_runtime::init::run_init() {
        Ok(never) => match never {},
        Err(e) => Err(anyhow::Error::from(e)),
    }
}
