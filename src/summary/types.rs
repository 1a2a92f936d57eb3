//! Data types produced by the summary step.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::compare::{Parameter, Source};

/// Agreement of one parameter between two sources, over the rows where both
/// have a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairAgreement {
    pub parameter: Parameter,
    pub left: Source,
    pub right: Source,
    pub matched: usize,
    pub mean_difference: f64,
    pub stddev: f64,
    pub grade: String,
}

/// Line counts per source and overlap.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Coverage {
    pub rows: usize,
    pub per_source: [usize; 3],
    pub in_all_sources: usize,
    pub in_one_source: usize,
}

/// Header block of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSummary {
    pub generated_at: DateTime<Utc>,
    pub region: String,
    pub coverage: Coverage,
    pub agreements: Vec<PairAgreement>,
}
