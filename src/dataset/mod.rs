//! Dataset loading.
//!
//! Reads the tickets CSV once at startup and produces the immutable
//! `Dataset` every aggregation runs against.

pub mod loader;

pub use loader::*;
