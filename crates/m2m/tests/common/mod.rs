//! Shared test utilities for m2m integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp directories and fake tools
//! - `ConfigBuilder` for creating test configurations programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
