//! Common test utilities for dotenvx-sh E2E tests

#[allow(dead_code)]
pub mod assertions;
#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
pub use config::*;
#[allow(unused_imports)]
pub use fixtures::*;
