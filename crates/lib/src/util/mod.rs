//! Shared utilities.
//!
//! Test helpers shared by the unit tests of the crate.

#[cfg(test)]
pub mod testutil;
