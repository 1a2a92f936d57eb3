//! The analysis run: load, filter, compare, present.

use anyhow::Result;
use tracing::info;

use crate::compare::{ComparisonRow, Source, compare};
use crate::config::{AnalysisConfig, REPORT_TITLE};
use crate::loader::{load_network, load_reference, merge_parallel};
use crate::output::{
    ReportInput, ReportOptions, log_summary, render_report, write_comparison_csv, write_report,
};
use crate::region::{filter_reference, filter_region};
use crate::summary::{ComparisonSummary, summarize};

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub rows: usize,
    pub map_skipped: usize,
    pub summary: ComparisonSummary,
}

/// Runs the whole comparison once and writes the report.
///
/// # Errors
///
/// Fails if any input cannot be loaded or an output cannot be written.
#[tracing::instrument(skip_all, fields(region = %config.region))]
pub fn run(config: &AnalysisConfig) -> Result<RunOutcome> {
    let labels = &config.labels;

    let eur = load_network(&config.eur_network, labels.get(Source::A))?;
    let earth = load_network(&config.earth_network, labels.get(Source::B))?;
    let mut reference = load_reference(&config.reference)?;

    if config.merge_parallel {
        let before = reference.len();
        reference = merge_parallel(reference);
        info!(before, after = reference.len(), "Merged parallel reference circuits");
    }
    if config.filter_reference {
        reference = filter_reference(&reference, &config.region);
    }

    let a = filter_region(&eur, &config.region);
    let b = filter_region(&earth, &config.region);

    let rows: Vec<ComparisonRow> = compare(&a, &b, &reference).collect();
    let summary = summarize(&config.region.name, &rows);
    log_summary(&summary, labels);

    let report = render_report(
        &ReportInput {
            rows: &rows,
            summary: &summary,
            a: &a,
            b: &b,
            reference: &reference,
        },
        &ReportOptions {
            title: REPORT_TITLE,
            labels,
            region: &config.region,
            highlight: config.highlight,
        },
    )?;
    write_report(&config.output, &report.html)?;

    if let Some(path) = &config.csv {
        write_comparison_csv(path, &rows, labels)?;
    }

    Ok(RunOutcome {
        rows: rows.len(),
        map_skipped: report.map_skipped,
        summary,
    })
}
