//! Live (observable) read models over SQLite.
//!
//! # Responsibility
//! - Hold the latest value of a read model and fan it out to subscribers.
//! - Re-run read models after writes touch the tables they depend on.
//!
//! # Invariants
//! - New subscribers immediately receive the latest value.
//! - Every re-run publishes the full current result; there is no diffing.
//! - Subscriber callbacks never run while the connection or registry lock
//!   is held.

pub mod subject;
pub mod tracker;

pub use subject::{Observable, Subject, Subscription};
pub use tracker::{InvalidationTracker, PendingEmissions, Table};
