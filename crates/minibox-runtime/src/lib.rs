//! # minibox-runtime
//!
//! Container lifecycle management for minibox: the one-shot command channel
//! between parent and container, the namespace-creating process launcher
//! with its re-exec init handoff, the init handler that runs as the
//! namespace's PID 1, the on-disk container registry, image commit, and the
//! `run` orchestration that ties them together.

pub mod commit;
pub mod init;
pub mod launcher;
pub mod pipe;
pub mod registry;
pub mod run;
