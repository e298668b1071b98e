#![allow(dead_code)]

pub mod camera;

#[path = "../../src/test_support/fixtures.rs"]
pub mod fixtures;

#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;
