//! Test fixtures.

pub mod federation;
