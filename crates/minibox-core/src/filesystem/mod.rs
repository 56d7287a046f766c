//! Layered container filesystem management.
//!
//! A container's root is assembled from a reusable read-only base layer and
//! a disposable writable layer, joined by an overlay union mount, with an
//! optional host-directory bind volume nested inside. The init path commits
//! the assembled tree as the process root via `pivot_root(2)`.

pub mod overlay;
pub mod pivot;
pub mod volume;
pub mod workspace;

pub use volume::Volume;
pub use workspace::Workspace;
