//! Flutter-facing bindings for the Mono task core.

pub mod api;
