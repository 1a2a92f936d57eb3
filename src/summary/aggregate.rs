use chrono::Utc;

use crate::compare::{ComparisonRow, Parameter, Source};
use crate::summary::grade::{agreement, grade};
use crate::summary::types::{ComparisonSummary, Coverage, PairAgreement};

/// Arithmetic mean and population standard deviation. Both 0.0 when empty.
fn mean_and_stddev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn coverage(rows: &[ComparisonRow]) -> Coverage {
    let mut coverage = Coverage {
        rows: rows.len(),
        ..Default::default()
    };

    for row in rows {
        for source in Source::ALL {
            if row.in_source(source) {
                coverage.per_source[source.index()] += 1;
            }
        }
        match row.source_count() {
            3 => coverage.in_all_sources += 1,
            1 => coverage.in_one_source += 1,
            _ => {}
        }
    }

    coverage
}

fn pair_agreement(
    rows: &[ComparisonRow],
    parameter: Parameter,
    left: Source,
    right: Source,
) -> PairAgreement {
    let series: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.difference(parameter, left, right))
        .collect();
    let (mean, stddev) = mean_and_stddev(&series);

    PairAgreement {
        parameter,
        left,
        right,
        matched: series.len(),
        mean_difference: mean,
        stddev,
        grade: if series.is_empty() {
            "-".into()
        } else {
            grade(agreement(mean))
        },
    }
}

/// Summarizes how well the sources agree, per parameter and source pair.
pub fn summarize(region: &str, rows: &[ComparisonRow]) -> ComparisonSummary {
    let agreements = Parameter::ALL
        .into_iter()
        .flat_map(|parameter| {
            Source::PAIRS
                .into_iter()
                .map(move |(left, right)| pair_agreement(rows, parameter, left, right))
        })
        .collect();

    ComparisonSummary {
        generated_at: Utc::now(),
        region: region.to_string(),
        coverage: coverage(rows),
        agreements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::network::NetworkModel;
    use crate::network::fixtures::{bus, line};

    fn network(name: &str, lines: Vec<crate::network::Line>) -> NetworkModel {
        let mut n = NetworkModel::from_parts(
            name,
            vec![bus("A", 13.4, 52.5, "DE"), bus("B", 12.4, 51.3, "DE")],
            lines,
            vec![],
        );
        n.calculate_dependent_values().unwrap();
        n
    }

    #[test]
    fn test_mean_and_stddev() {
        assert_eq!(mean_and_stddev(&[]), (0.0, 0.0));
        let (mean, sd) = mean_and_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(sd, 2.0);
    }

    #[test]
    fn test_summary_of_identical_networks() {
        let a = network("eur", vec![line("l1", "A", "B", 4.0)]);
        let b = network("earth", vec![line("m1", "A", "B", 4.0)]);
        let rows: Vec<_> = compare(&a, &b, &[]).collect();

        let summary = summarize("50Hertz", &rows);

        assert_eq!(summary.coverage.rows, 1);
        assert_eq!(summary.coverage.per_source, [1, 1, 0]);
        assert_eq!(summary.coverage.in_all_sources, 0);
        assert_eq!(summary.agreements.len(), Parameter::ALL.len() * 3);

        let r_ab = summary
            .agreements
            .iter()
            .find(|a| a.parameter == Parameter::Resistance && a.right == Source::B)
            .unwrap();
        assert_eq!(r_ab.matched, 1);
        assert_eq!(r_ab.mean_difference, 0.0);
        assert_eq!(r_ab.grade, "A+");

        let r_a_ref = summary
            .agreements
            .iter()
            .find(|a| a.parameter == Parameter::Resistance && a.right == Source::Reference)
            .unwrap();
        assert_eq!(r_a_ref.matched, 0);
        assert_eq!(r_a_ref.grade, "-");
    }

    #[test]
    fn test_summary_grades_mismatch() {
        let a = network("eur", vec![line("l1", "A", "B", 4.0)]);
        let b = network("earth", vec![line("m1", "A", "B", 2.0)]);
        let rows: Vec<_> = compare(&a, &b, &[]).collect();

        let summary = summarize("50Hertz", &rows);
        let r_ab = &summary.agreements[0];

        assert_eq!(r_ab.parameter, Parameter::Resistance);
        assert!((r_ab.mean_difference - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(r_ab.grade, "F");
    }
}
