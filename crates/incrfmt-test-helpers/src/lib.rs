//! Test utilities and fixtures for incrfmt
//!
//! Shared by the integration tests of the workspace crates.

pub mod fixtures;
pub mod mocks;
