//! Core use-case services.
//!
//! # Responsibility
//! - Expose task, sub-task and task-list use-cases over a shared store.
//! - Publish every write to the live queries that depend on it.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Writes notify exactly the tables they touch, cascades included.

pub mod sub_task_service;
pub mod task_list_service;
pub mod task_service;
