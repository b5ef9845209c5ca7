//! Domain model for tasks, sub-tasks and task lists.
//!
//! # Responsibility
//! - Define the immutable records handed to services, state holders and FFI.
//! - Provide view-level projections (bucketing) that do not touch storage.
//!
//! # Invariants
//! - Every entity is identified by an opaque string id generated once.
//! - Completion and bookmark flags are independent.

pub mod bucket;
pub mod sub_task;
pub mod task;
pub mod task_list;
