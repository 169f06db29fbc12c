//! Integration test infrastructure for the squeezefs workspace.
//!
//! The [`harness`] module provides memory-backed overlay construction used
//! by every suite; the sibling modules hold the end-to-end scenarios,
//! round-trip matrices, and policy checks.

pub mod harness;


pub use harness::{overlay, overlay_with_defaults, read_back, write_file};
