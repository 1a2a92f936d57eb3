//! Tabular renderings: the per-line comparison table and the agreement
//! summary.

use std::fmt::Write;

use super::html::escape;
use super::{SourceLabels, mismatch_color};
use crate::compare::{ComparisonRow, Parameter, Source, SourceValue};
use crate::summary::ComparisonSummary;

fn value_cell(value: &SourceValue) -> String {
    match value.measurement() {
        Some(m) => format!("<td>{}</td>", escape(&m.quantity.to_string())),
        None => "<td class=\"absent\">n/a</td>".to_string(),
    }
}

fn percent(diff: Option<f64>) -> String {
    diff.map(|d| format!("{:.1} %", d * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

/// One row per line, one column group per source. The last column is the
/// largest pairwise difference of `highlight`.
pub fn comparison_table(
    rows: &[ComparisonRow],
    labels: &SourceLabels,
    highlight: Parameter,
) -> String {
    let group_width = Parameter::ALL.len() + 1;
    let mut html = String::from("<table id=\"lines\">\n<thead>\n<tr><th rowspan=\"2\">line</th><th rowspan=\"2\">circuit</th>");
    for source in Source::ALL {
        let _ = write!(
            html,
            "<th colspan=\"{group_width}\">{}</th>",
            escape(labels.get(source))
        );
    }
    let _ = writeln!(html, "<th rowspan=\"2\">max Δ {}</th></tr>", highlight.symbol());

    html.push_str("<tr>");
    for _ in Source::ALL {
        html.push_str("<th>id</th>");
        for parameter in Parameter::ALL {
            let _ = write!(html, "<th>{}</th>", escape(parameter.symbol()));
        }
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in rows {
        let _ = write!(
            html,
            "<tr><td class=\"key\">{}</td><td>{}</td>",
            escape(&row.key.to_string()),
            row.circuit + 1
        );
        for source in Source::ALL {
            match row.member(source) {
                Some(id) => {
                    let _ = write!(html, "<td class=\"id\">{}</td>", escape(id));
                }
                None => html.push_str("<td class=\"absent\">n/a</td>"),
            }
            for parameter in Parameter::ALL {
                html.push_str(&value_cell(row.value(parameter, source)));
            }
        }
        let diff = row.max_difference(highlight);
        let _ = writeln!(
            html,
            "<td style=\"color: {}\">{}</td></tr>",
            mismatch_color(diff),
            percent(diff)
        );
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Coverage counts and per-parameter agreement between source pairs.
pub fn summary_table(summary: &ComparisonSummary, labels: &SourceLabels) -> String {
    let coverage = &summary.coverage;
    let mut html = String::from("<section id=\"summary\">\n<h2>Summary</h2>\n<p>");
    let _ = write!(html, "{} lines compared", coverage.rows);
    for source in Source::ALL {
        let _ = write!(
            html,
            ", {} in {}",
            coverage.per_source[source.index()],
            escape(labels.get(source))
        );
    }
    let _ = writeln!(
        html,
        "; {} in all three, {} in only one.</p>",
        coverage.in_all_sources, coverage.in_one_source
    );

    html.push_str("<table id=\"agreement\">\n<thead><tr><th>parameter</th><th>sources</th><th>matched</th><th>mean Δ</th><th>σ</th><th>grade</th></tr></thead>\n<tbody>\n");
    for agreement in &summary.agreements {
        let _ = writeln!(
            html,
            "<tr><td class=\"key\">{}</td><td class=\"key\">{} / {}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            agreement.parameter,
            escape(labels.get(agreement.left)),
            escape(labels.get(agreement.right)),
            agreement.matched,
            percent((agreement.matched > 0).then_some(agreement.mean_difference)),
            percent((agreement.matched > 0).then_some(agreement.stddev)),
            escape(&agreement.grade)
        );
    }
    html.push_str("</tbody>\n</table>\n</section>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::network::NetworkModel;
    use crate::network::fixtures::{bus, line};
    use crate::summary::summarize;

    fn rows() -> Vec<ComparisonRow> {
        let mut a = NetworkModel::from_parts(
            "eur",
            vec![bus("A", 13.4, 52.5, "DE"), bus("B<x>", 12.4, 51.3, "DE")],
            vec![line("l1", "A", "B<x>", 4.0)],
            vec![],
        );
        a.calculate_dependent_values().unwrap();
        let b = NetworkModel::new("earth");
        compare(&a, &b, &[]).collect()
    }

    #[test]
    fn test_comparison_table_has_row_per_line() {
        let html = comparison_table(&rows(), &SourceLabels::default(), Parameter::Resistance);

        assert_eq!(html.matches("<tr><td class=\"key\">").count(), 1);
        assert!(html.contains("A - B&lt;x&gt;"));
        assert!(html.contains("<td>4.000 Ω</td>"));
        assert!(html.contains("PyPSA-Earth"));
        // B and reference are absent: id plus six parameters each
        assert_eq!(html.matches("<td class=\"absent\">n/a</td>").count(), 14);
    }

    #[test]
    fn test_summary_table_lists_all_agreements() {
        let rows = rows();
        let summary = summarize("50Hertz", &rows);
        let html = summary_table(&summary, &SourceLabels::default());

        assert!(html.contains("1 lines compared"));
        assert_eq!(html.matches("<tr><td class=\"key\">").count(), Parameter::ALL.len() * 3);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(Some(0.049)), "4.9 %");
        assert_eq!(percent(None), "n/a");
    }
}
