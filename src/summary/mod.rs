//! Agreement statistics between the compared sources.
//!
//! For each tracked parameter and each pair of sources this computes the mean
//! and spread of the relative difference over the lines both sources have,
//! and grades the agreement with a letter.

pub mod aggregate;
pub mod grade;
pub mod types;

pub use aggregate::summarize;
pub use types::{ComparisonSummary, Coverage, PairAgreement};
