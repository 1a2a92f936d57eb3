//! Reading the persisted inputs: PyPSA network exports and the TSO
//! reference table.
//!
//! Plain and gzip-compressed (`.gz`) files are accepted everywhere.

pub mod pypsa;
pub mod reference;

pub use pypsa::load_network;
pub use reference::{ReferenceRecord, load_reference, merge_parallel};

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::LoadError;

/// Opens `path` for reading, decompressing on the fly when it ends in `.gz`.
pub(crate) fn open_input(path: &Path) -> Result<Box<dyn Read>, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let reader = BufReader::new(file);

    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        debug!(path = %path.display(), "Reading gzip-compressed input");
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Deserializes every row of a headed CSV file.
pub(crate) fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let reader = open_input(path)?;
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in rdr.deserialize() {
        let record: T = result.map_err(|e| LoadError::csv(path, e))?;
        rows.push(record);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use serde::Deserialize;
    use std::env;
    use std::fs;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        name: String,
        value: f64,
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn test_read_rows_plain() {
        let path = temp_path("grid_benchmark_loader_plain.csv");
        fs::write(&path, "name,value\na,1.5\nb,2\n").unwrap();

        let rows: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].value, 2.0);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_rows_gzip() {
        let path = temp_path("grid_benchmark_loader_gz.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"name,value\na,1.5\n").unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let rows: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(
            rows,
            vec![Row {
                name: "a".to_string(),
                value: 1.5
            }]
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_rows_malformed_is_csv_error() {
        let path = temp_path("grid_benchmark_loader_bad.csv");
        fs::write(&path, "name,value\na,not-a-number\n").unwrap();

        let err = read_rows::<Row>(&path).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = open_input(&temp_path("grid_benchmark_does_not_exist.csv")).err();
        assert!(matches!(err, Some(LoadError::NotFound(_))));
    }
}
