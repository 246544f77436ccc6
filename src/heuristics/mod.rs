//! Heuristics module.
//!
//! Construction heuristics used to seed the exact search.

pub mod construction;

pub use construction::*;
