//! Shared test utilities for the lattice-field workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Lattice definition fixtures
//! - Field data generators
//! - Temp-file helpers for lattice definition files
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
//! use test_utils::{fixtures, assert_same_axes};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro asserting that two axis-name sequences hold the same multiset.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_same_axes;
///
/// assert_same_axes!(["x", "color", "color"], ["color", "x", "color"]); // passes
/// assert_same_axes!(["x", "color"], ["x", "x"]);                       // fails
/// ```
#[macro_export]
macro_rules! assert_same_axes {
    ($left:expr, $right:expr) => {{
        let mut left: Vec<String> = $left.iter().map(|s| s.to_string()).collect();
        let mut right: Vec<String> = $right.iter().map(|s| s.to_string()).collect();
        left.sort();
        right.sort();
        if left != right {
            panic!(
                "assertion failed: `(left ~ right)` (same axes)\n  left: `{:?}`,\n right: `{:?}`",
                left, right
            );
        }
    }};
}
