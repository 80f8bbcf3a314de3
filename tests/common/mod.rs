//! Common test utilities and helpers.
//!
//! This module provides shared functionality for all tests, including:
//! - Custom assertions
//! - Test fixtures and builders
//! - In-memory page and document backends

#![allow(dead_code)]

pub mod assertions;
pub mod fake;
pub mod fixtures;

pub use assertions::*;
pub use fake::*;
pub use fixtures::*;
