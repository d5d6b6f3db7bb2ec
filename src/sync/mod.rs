//! Synchronization of queued offline work
//!
//! This module provides:
//! - `Replayer`: a unit of replay logic contributed by a feature area
//! - `Reconciler`: single-flight fan-out of all registered replayers once the
//!   till is back online, followed by a queue clear
//! - `HttpReplayer`: ships the pending queue to a remote endpoint

pub mod reconciler;
pub mod replayer;

pub use reconciler::{Reconciler, SkipReason, SyncReport};
pub use replayer::{FnReplayer, HttpReplayer, Replayer, ReplayerRef};
