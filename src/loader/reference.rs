//! Reader for the static grid model table published by the TSO.
//!
//! The table has a two-row header: a category row (`Substation_1`,
//! `Electrical Parameters`, mostly blank) and a field row (`Full_name`,
//! `Resistance_R(Ω)`, ...). Columns are located by those names rather than by
//! position so that added columns in later releases do not shift anything.

use csv::StringRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use super::open_input;
use crate::error::LoadError;
use crate::network::Coordinate;

/// One line (circuit) from the reference table.
///
/// `r` and `x` are in Ω, `b` in μS, `length` in km, `kv` in kV and `mva` in
/// MVA.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceRecord {
    pub id: Option<String>,
    pub sub1: String,
    pub sub2: String,
    pub lon1: Option<f64>,
    pub lat1: Option<f64>,
    pub lon2: Option<f64>,
    pub lat2: Option<f64>,
    pub kv: Option<f64>,
    pub mva: Option<f64>,
    pub r: Option<f64>,
    pub x: Option<f64>,
    pub b: Option<f64>,
    pub length: Option<f64>,
}

impl ReferenceRecord {
    /// Order-independent name of the route, shared by parallel circuits.
    pub fn line_name(&self) -> String {
        let mut ends = [self.sub1.as_str(), self.sub2.as_str()];
        ends.sort_unstable();
        ends.join(" ")
    }

    pub fn endpoints(&self) -> [Option<Coordinate>; 2] {
        [
            self.lat1.zip(self.lon1).and_then(|(lat, lon)| Coordinate::new(lat, lon)),
            self.lat2.zip(self.lon2).and_then(|(lat, lon)| Coordinate::new(lat, lon)),
        ]
    }

    pub fn geometry(&self) -> Option<[Coordinate; 2]> {
        match self.endpoints() {
            [Some(from), Some(to)] => Some([from, to]),
            _ => None,
        }
    }
}

/// Apparent power rating of a three-phase line from its current limit.
pub fn thermal_rating_mva(current_a: f64, kv: f64) -> f64 {
    current_a * kv / 1e3 * 3f64.sqrt()
}

/// How a column is identified in the two header rows. `None` matches any
/// value in that row.
struct Column {
    name: &'static str,
    category: Option<&'static str>,
    field: Option<&'static str>,
}

const SUB1: Column = Column {
    name: "Substation_1/Full_name",
    category: Some("Substation_1"),
    field: Some("Full_name"),
};
const LON1: Column = Column {
    name: "Longitude_Substation_1",
    category: Some("Longitude_Substation_1"),
    field: None,
};
const LAT1: Column = Column {
    name: "Latitude_Substation_1",
    category: Some("Latitude_Substation_1"),
    field: None,
};
const SUB2: Column = Column {
    name: "Substation_2/Full_name",
    category: Some("Substation_2"),
    field: Some("Full_name"),
};
const LON2: Column = Column {
    name: "Longitude_Substation_2",
    category: Some("Longitude_Substation_2"),
    field: None,
};
const LAT2: Column = Column {
    name: "Latitude_Substation_2",
    category: Some("Latitude_Substation_2"),
    field: None,
};
const CURRENT: Column = Column {
    name: "Fixed",
    category: None,
    field: Some("Fixed"),
};
const KV: Column = Column {
    name: "Voltage_level(kV)",
    category: None,
    field: Some("Voltage_level(kV)"),
};
const R: Column = Column {
    name: "Resistance_R(Ω)",
    category: None,
    field: Some("Resistance_R(Ω)"),
};
const X: Column = Column {
    name: "Reactance_X(Ω)",
    category: None,
    field: Some("Reactance_X(Ω)"),
};
const B: Column = Column {
    name: "Susceptance_B(μS)",
    category: None,
    field: Some("Susceptance_B(μS)"),
};
const LENGTH: Column = Column {
    name: "Length_(km)",
    category: None,
    field: Some("Length_(km)"),
};

/// Field names that carry a line identifier in some releases of the table.
const IDENTIFIER_FIELDS: &[&str] = &["NE_name", "Line_ID", "ID"];

struct Header {
    categories: Vec<String>,
    fields: Vec<String>,
}

impl Header {
    fn new(categories: &StringRecord, fields: &StringRecord) -> Self {
        Header {
            categories: categories.iter().map(|c| c.trim().to_string()).collect(),
            fields: fields.iter().map(|f| f.trim().to_string()).collect(),
        }
    }

    fn find(&self, column: &Column) -> Option<usize> {
        (0..self.categories.len().max(self.fields.len())).find(|&i| {
            let category = self.categories.get(i).map(String::as_str).unwrap_or("");
            let field = self.fields.get(i).map(String::as_str).unwrap_or("");
            column.category.is_none_or(|c| c == category) && column.field.is_none_or(|f| f == field)
        })
    }

    fn require(&self, column: &Column, path: &Path) -> Result<usize, LoadError> {
        self.find(column).ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.name.to_string(),
        })
    }

    fn identifier(&self) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| IDENTIFIER_FIELDS.contains(&f.as_str()))
    }
}

/// Picks `;` for files exported with a German locale, `,` otherwise. The
/// German export also writes decimal commas, see [`RowReader::number`].
fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");
    if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Column positions resolved once per file.
struct Layout {
    id: Option<usize>,
    sub1: usize,
    lon1: usize,
    lat1: usize,
    sub2: usize,
    lon2: usize,
    lat2: usize,
    current: usize,
    kv: usize,
    r: usize,
    x: usize,
    b: usize,
    length: usize,
}

impl Layout {
    fn resolve(header: &Header, path: &Path) -> Result<Self, LoadError> {
        Ok(Layout {
            id: header.identifier(),
            sub1: header.require(&SUB1, path)?,
            lon1: header.require(&LON1, path)?,
            lat1: header.require(&LAT1, path)?,
            sub2: header.require(&SUB2, path)?,
            lon2: header.require(&LON2, path)?,
            lat2: header.require(&LAT2, path)?,
            current: header.require(&CURRENT, path)?,
            kv: header.require(&KV, path)?,
            r: header.require(&R, path)?,
            x: header.require(&X, path)?,
            b: header.require(&B, path)?,
            length: header.require(&LENGTH, path)?,
        })
    }
}

struct RowReader<'a> {
    record: &'a StringRecord,
    path: &'a Path,
    row: usize,
    decimal_comma: bool,
}

impl RowReader<'_> {
    fn text(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or("").trim()
    }

    fn number(&self, index: usize, column: &Column) -> Result<Option<f64>, LoadError> {
        let raw = self.text(index);
        if raw.is_empty() {
            return Ok(None);
        }
        let parsed = if self.decimal_comma {
            raw.replacen(',', ".", 1).parse::<f64>()
        } else {
            raw.parse::<f64>()
        };
        parsed
            .map(Some)
            .map_err(|_| LoadError::InvalidValue {
                path: self.path.to_path_buf(),
                row: self.row,
                column: column.name.to_string(),
                value: raw.to_string(),
            })
    }

    fn parse(&self, layout: &Layout) -> Result<ReferenceRecord, LoadError> {
        let kv = self.number(layout.kv, &KV)?;
        let current = self.number(layout.current, &CURRENT)?;

        Ok(ReferenceRecord {
            id: layout
                .id
                .map(|i| self.text(i).to_string())
                .filter(|id| !id.is_empty()),
            sub1: self.text(layout.sub1).to_string(),
            sub2: self.text(layout.sub2).to_string(),
            lon1: self.number(layout.lon1, &LON1)?,
            lat1: self.number(layout.lat1, &LAT1)?,
            lon2: self.number(layout.lon2, &LON2)?,
            lat2: self.number(layout.lat2, &LAT2)?,
            kv,
            mva: current.zip(kv).map(|(i, kv)| thermal_rating_mva(i, kv)),
            r: self.number(layout.r, &R)?,
            x: self.number(layout.x, &X)?,
            b: self.number(layout.b, &B)?,
            length: self.number(layout.length, &LENGTH)?,
        })
    }
}

/// Reads the reference table at `path`, one record per data row, in file
/// order. Rows without both substation names are skipped.
///
/// # Errors
///
/// Returns a [`LoadError`] if the file is missing, lacks the two header rows
/// or one of the required columns, or holds a non-numeric value in a numeric
/// column.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_reference(path: &Path) -> Result<Vec<ReferenceRecord>, LoadError> {
    let mut content = String::new();
    open_input(path)?
        .read_to_string(&mut content)
        .map_err(|e| LoadError::io(path, e))?;

    let content = content.trim_start_matches('\u{feff}');

    let delimiter = sniff_delimiter(content);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut records = rdr.records();
    let categories = records
        .next()
        .ok_or_else(|| LoadError::EmptyHeader(path.to_path_buf()))?
        .map_err(|e| LoadError::csv(path, e))?;
    let fields = records
        .next()
        .ok_or_else(|| LoadError::EmptyHeader(path.to_path_buf()))?
        .map_err(|e| LoadError::csv(path, e))?;

    let layout = Layout::resolve(&Header::new(&categories, &fields), path)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (i, result) in records.enumerate() {
        let record = result.map_err(|e| LoadError::csv(path, e))?;
        let reader = RowReader {
            record: &record,
            path,
            // 1-based file line: two header rows precede the data
            row: i + 3,
            decimal_comma: delimiter == b';',
        };

        if reader.text(layout.sub1).is_empty() || reader.text(layout.sub2).is_empty() {
            skipped += 1;
            continue;
        }

        rows.push(reader.parse(&layout)?);
    }

    if skipped > 0 {
        debug!(skipped, "Skipped reference rows without substation names");
    }
    info!(records = rows.len(), "Reference table loaded");

    Ok(rows)
}

/// Equivalent resistance or reactance of parallel branches.
fn parallel(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(1.0 / values.iter().map(|v| 1.0 / v).sum::<f64>())
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn present(group: &[ReferenceRecord], field: impl Fn(&ReferenceRecord) -> Option<f64>) -> Vec<f64> {
    group.iter().filter_map(field).collect()
}

/// `record` with its ends swapped when it is listed as `sub2 - sub1` relative
/// to `sub1`.
fn oriented(record: &ReferenceRecord, sub1: &str) -> ReferenceRecord {
    if record.sub1 == sub1 {
        return record.clone();
    }
    ReferenceRecord {
        sub1: record.sub2.clone(),
        sub2: record.sub1.clone(),
        lon1: record.lon2,
        lat1: record.lat2,
        lon2: record.lon1,
        lat2: record.lat1,
        ..record.clone()
    }
}

/// Collapses parallel circuits of the same route (same unordered substation
/// pair) into one equivalent line: impedances combine in parallel, ratings
/// add up, everything else is averaged. Circuits listed the other way round
/// are turned to match the first one before their end coordinates are
/// averaged. Missing values are ignored.
pub fn merge_parallel(records: Vec<ReferenceRecord>) -> Vec<ReferenceRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<ReferenceRecord>> = HashMap::new();

    for record in records {
        let name = record.line_name();
        if !groups.contains_key(&name) {
            order.push(name.clone());
        }
        groups.entry(name).or_default().push(record);
    }

    order
        .into_iter()
        .filter_map(|name| groups.remove(&name))
        .map(|group| {
            let sub1 = group[0].sub1.clone();
            let group: Vec<ReferenceRecord> = group.iter().map(|r| oriented(r, &sub1)).collect();
            let mva = present(&group, |r| r.mva);
            let first = &group[0];
            ReferenceRecord {
                id: first.id.clone(),
                sub1: first.sub1.clone(),
                sub2: first.sub2.clone(),
                lon1: mean(&present(&group, |r| r.lon1)),
                lat1: mean(&present(&group, |r| r.lat1)),
                lon2: mean(&present(&group, |r| r.lon2)),
                lat2: mean(&present(&group, |r| r.lat2)),
                kv: mean(&present(&group, |r| r.kv)),
                mva: (!mva.is_empty()).then(|| mva.iter().sum()),
                r: parallel(&present(&group, |r| r.r)),
                x: parallel(&present(&group, |r| r.x)),
                b: mean(&present(&group, |r| r.b)),
                length: mean(&present(&group, |r| r.length)),
            }
        })
        .collect()
}
