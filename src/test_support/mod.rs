//! Shared helpers for unit tests.

pub mod fixtures;
pub mod socket_guard;
