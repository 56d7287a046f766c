//! # minibox-core
//!
//! Linux isolation primitives for the minibox runtime: cgroup subsystem
//! controllers behind a uniform capability interface, the layered root
//! filesystem workspace (overlay union mount, bind volumes, pivot_root),
//! and namespace clone-flag configuration.
//!
//! Everything here is keyed by container identifier — no module owns a
//! process-wide path or group label, so concurrent containers never collide.

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
