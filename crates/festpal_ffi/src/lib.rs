//! Flutter-facing bindings for `festpal_core`.

pub mod api;
