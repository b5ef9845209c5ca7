//! Route-scoped screen state holders.
//!
//! # Responsibility
//! - Own the live subscriptions a screen needs for as long as its route lives.
//! - Turn user intents into service calls.
//!
//! # Invariants
//! - A holder's subscriptions are cancelled by `dispose` or by dropping it.
//! - Writes started by a holder complete even if the holder is disposed
//!   right afterwards; only reads are tied to the holder's lifetime.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod calendar_state;
pub mod task_detail_state;
pub mod task_list_state;

pub use calendar_state::CalendarState;
pub use task_detail_state::TaskDetailState;
pub use task_list_state::{TaskListState, TaskListUiState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
