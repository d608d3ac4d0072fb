//! Analysis modules.
//!
//! Filtering and aggregation of the ticket dataset into dashboard views.

pub mod aggregator;

pub use aggregator::*;
