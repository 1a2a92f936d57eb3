//! Report rendering and persistence.
//!
//! The report is one HTML file: a map of the compared lines with per-source
//! overlays, an agreement summary and the full comparison table. A CSV export
//! of the table is available separately.

pub mod export;
pub mod html;
pub mod map;
pub mod table;

pub use export::write_comparison_csv;

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::compare::{ComparisonRow, Parameter, Source};
use crate::loader::ReferenceRecord;
use crate::network::NetworkModel;
use crate::region::Region;
use crate::summary::ComparisonSummary;

/// Display names of the three sources.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLabels([String; 3]);

impl SourceLabels {
    pub fn new(a: &str, b: &str, reference: &str) -> Self {
        SourceLabels([a.to_string(), b.to_string(), reference.to_string()])
    }

    pub fn get(&self, source: Source) -> &str {
        &self.0[source.index()]
    }
}

impl Default for SourceLabels {
    fn default() -> Self {
        SourceLabels::new("PyPSA-Eur", "PyPSA-Earth", "50Hertz")
    }
}

/// Mismatch bands for map lines and table cells.
const MISMATCH_BANDS: &[(f64, &str)] = &[(0.10, "#2e7d32"), (0.25, "#ef6c00")];
const MISMATCH_HIGH: &str = "#c62828";
/// Fewer than two sources have a value.
const MISMATCH_UNKNOWN: &str = "#757575";

pub fn mismatch_color(difference: Option<f64>) -> &'static str {
    let Some(difference) = difference else {
        return MISMATCH_UNKNOWN;
    };
    MISMATCH_BANDS
        .iter()
        .find(|(limit, _)| difference < *limit)
        .map(|(_, color)| *color)
        .unwrap_or(MISMATCH_HIGH)
}

fn legend(highlight: Parameter) -> String {
    let mut html = format!("Line color, max Δ {}:", highlight.symbol());
    let mut lower = 0.0;
    for (limit, color) in MISMATCH_BANDS {
        let _ = write!(
            html,
            "<span style=\"background: {color}\"></span>{:.0}–{:.0} %",
            lower * 100.0,
            limit * 100.0
        );
        lower = *limit;
    }
    let _ = write!(
        html,
        "<span style=\"background: {MISMATCH_HIGH}\"></span>≥ {:.0} %<span style=\"background: {MISMATCH_UNKNOWN}\"></span>single source",
        lower * 100.0
    );
    html
}

pub struct ReportOptions<'a> {
    pub title: &'a str,
    pub labels: &'a SourceLabels,
    pub region: &'a Region,
    pub highlight: Parameter,
}

/// Inputs drawn on the report, after region filtering.
pub struct ReportInput<'a> {
    pub rows: &'a [ComparisonRow],
    pub summary: &'a ComparisonSummary,
    pub a: &'a NetworkModel,
    pub b: &'a NetworkModel,
    pub reference: &'a [ReferenceRecord],
}

pub struct RenderedReport {
    pub html: String,
    /// Rows present in the table but missing from the map.
    pub map_skipped: usize,
}

/// Renders the complete HTML report.
pub fn render_report(input: &ReportInput<'_>, options: &ReportOptions<'_>) -> Result<RenderedReport> {
    let (map, map_skipped) = map::build_map(
        &map::MapInput {
            rows: input.rows,
            a: input.a,
            b: input.b,
            reference: input.reference,
        },
        options.labels,
        options.region,
        options.highlight,
    );
    let map_json = serde_json::to_string(&map).context("serializing map layers")?;

    let meta = format!(
        "Region {} · generated {}",
        html::escape(&input.summary.region),
        input.summary.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    let html = html::page(&html::Sections {
        title: options.title,
        meta: &meta,
        legend: &legend(options.highlight),
        summary: &table::summary_table(input.summary, options.labels),
        table: &table::comparison_table(input.rows, options.labels, options.highlight),
        map_json: &map_json,
    });

    debug!(bytes = html.len(), map_skipped, "Report rendered");
    Ok(RenderedReport { html, map_skipped })
}

/// Writes the report to `path`, creating parent directories as needed.
pub fn write_report(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, html).with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), bytes = html.len(), "Report written");
    Ok(())
}

/// Logs the agreement summary, one event per parameter and source pair.
pub fn log_summary(summary: &ComparisonSummary, labels: &SourceLabels) {
    let coverage = &summary.coverage;
    info!(
        rows = coverage.rows,
        a = coverage.per_source[0],
        b = coverage.per_source[1],
        reference = coverage.per_source[2],
        in_all_sources = coverage.in_all_sources,
        "Comparison coverage"
    );

    for agreement in summary.agreements.iter().filter(|a| a.matched > 0) {
        info!(
            parameter = %agreement.parameter,
            left = labels.get(agreement.left),
            right = labels.get(agreement.right),
            matched = agreement.matched,
            mean_difference = agreement.mean_difference,
            grade = %agreement.grade,
            "Agreement"
        );
    }
}
