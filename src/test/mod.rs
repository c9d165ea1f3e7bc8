//! Shared fixtures for unit tests.
//!
//! - [`factories`] builds small debug-information models with known contents
//! - [`helpers`] provides a scriptable in-memory host debugger

pub mod factories;
pub mod helpers;

pub use helpers::MockHost;
