//! Aggregation and statistics.
//!
//! Pure transformations from fetched records to indicator summaries; each run
//! builds new structures and never mutates a previous result.

pub mod aggregator;
pub mod statistics;

pub use aggregator::*;
pub use statistics::*;
