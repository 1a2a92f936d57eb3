//! CSV export of the comparison table.

use anyhow::Result;
use csv::WriterBuilder;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

use super::SourceLabels;
use crate::compare::{ComparisonRow, Parameter, Source};

fn header(labels: &SourceLabels) -> Vec<String> {
    let mut columns = vec!["line".to_string(), "circuit".to_string()];
    for source in Source::ALL {
        let label = labels.get(source);
        columns.push(format!("{label} id"));
        for parameter in Parameter::ALL {
            columns.push(format!("{label} {}", parameter.symbol()));
            columns.push(format!("{label} {} unit", parameter.symbol()));
        }
    }
    columns
}

fn record(row: &ComparisonRow) -> Vec<String> {
    let mut fields = vec![row.key.to_string(), (row.circuit + 1).to_string()];
    for source in Source::ALL {
        fields.push(row.member(source).unwrap_or_default().to_string());
        for parameter in Parameter::ALL {
            match row.value(parameter, source).measurement() {
                Some(m) => {
                    fields.push(m.quantity.value.to_string());
                    fields.push(m.quantity.unit.symbol().to_string());
                }
                None => {
                    fields.push(String::new());
                    fields.push(String::new());
                }
            }
        }
    }
    fields
}

/// Writes `rows` to a new CSV file at `path`, replacing any existing file.
///
/// Each value keeps the unit of its source; absent values are empty cells.
pub fn write_comparison_csv(path: &Path, rows: &[ComparisonRow], labels: &SourceLabels) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing comparison CSV");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    writer.write_record(header(labels))?;
    for row in rows {
        writer.write_record(record(row))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Comparison CSV written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::network::NetworkModel;
    use crate::network::fixtures::{bus, line};
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn rows() -> Vec<ComparisonRow> {
        let mut a = NetworkModel::from_parts(
            "eur",
            vec![bus("A", 13.4, 52.5, "DE"), bus("B", 12.4, 51.3, "DE")],
            vec![line("l1", "A", "B", 4.0), line("l2", "A", "B", 4.0)],
            vec![],
        );
        a.calculate_dependent_values().unwrap();
        compare(&a, &NetworkModel::new("earth"), &[]).collect()
    }

    #[test]
    fn test_write_comparison_csv() {
        let path = temp_path("grid_benchmark_export.csv");
        let _ = fs::remove_file(&path);

        write_comparison_csv(&path, &rows(), &SourceLabels::default()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        // 1 header + 2 circuits
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("line,circuit,PyPSA-Eur id,PyPSA-Eur r,PyPSA-Eur r unit"));
        assert!(lines[1].starts_with("A - B,1,l1,4,Ω,"));
        assert!(lines[2].starts_with("A - B,2,l2,"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let path = temp_path("grid_benchmark_export_twice.csv");
        let _ = fs::remove_file(&path);

        write_comparison_csv(&path, &rows(), &SourceLabels::default()).unwrap();
        write_comparison_csv(&path, &rows(), &SourceLabels::default()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("line,")).count();
        assert_eq!(header_count, 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_record_width_matches_header() {
        let rows = rows();
        assert_eq!(record(&rows[0]).len(), header(&SourceLabels::default()).len());
    }
}
