#![forbid(unsafe_code)]

//! PM Simulator Runtime
//!
//! Wraps the kernel with session management, a repository seam,
//! replay, snapshots and drift detection.
//!
//! No domain logic lives here: all transitions and invariants
//! are delegated to the kernel.

pub mod repository;
pub mod replay;
pub mod snapshot_codec;
pub mod session;
pub mod drift;
