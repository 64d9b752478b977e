//! Shared test utilities for the coverage tile workspace.
//!
//! This crate provides common testing infrastructure including:
//! - MVT payload builders for upstream fixtures
//! - PNG decoding and pixel inspection helpers
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{MvtLayer, decode_png};
//! ```

pub mod fixtures;
pub mod pixels;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use pixels::*;
