use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::key::LineKey;
use super::units::Quantity;
use crate::network::Coordinate;

/// Which of the three inputs a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    A,
    B,
    Reference,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::A, Source::B, Source::Reference];

    /// Unordered pairs, in the order they are summarized.
    pub const PAIRS: [(Source, Source); 3] = [
        (Source::A, Source::B),
        (Source::A, Source::Reference),
        (Source::B, Source::Reference),
    ];

    pub fn index(self) -> usize {
        match self {
            Source::A => 0,
            Source::B => 1,
            Source::Reference => 2,
        }
    }
}

/// Line attributes tracked across sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Resistance,
    Reactance,
    Susceptance,
    Length,
    Voltage,
    Rating,
}

impl Parameter {
    pub const ALL: [Parameter; 6] = [
        Parameter::Resistance,
        Parameter::Reactance,
        Parameter::Susceptance,
        Parameter::Length,
        Parameter::Voltage,
        Parameter::Rating,
    ];

    pub fn index(self) -> usize {
        match self {
            Parameter::Resistance => 0,
            Parameter::Reactance => 1,
            Parameter::Susceptance => 2,
            Parameter::Length => 3,
            Parameter::Voltage => 4,
            Parameter::Rating => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Resistance => "resistance",
            Parameter::Reactance => "reactance",
            Parameter::Susceptance => "susceptance",
            Parameter::Length => "length",
            Parameter::Voltage => "voltage",
            Parameter::Rating => "rating",
        }
    }

    /// Short label used in table headers.
    pub fn symbol(self) -> &'static str {
        match self {
            Parameter::Resistance => "r",
            Parameter::Reactance => "x",
            Parameter::Susceptance => "b",
            Parameter::Length => "length",
            Parameter::Voltage => "kV",
            Parameter::Rating => "s_nom",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s) || p.symbol().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Parameter::ALL.iter().map(|p| p.name()).collect();
                format!("unknown parameter {s:?}: expected one of {}", names.join(", "))
            })
    }
}

/// A value as published by one source, in that source's unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub source: Source,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceValue {
    Present(Measurement),
    /// The source has no such line, or the line has no value for this
    /// parameter.
    Absent,
}

impl SourceValue {
    pub fn measurement(&self) -> Option<&Measurement> {
        match self {
            SourceValue::Present(m) => Some(m),
            SourceValue::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, SourceValue::Present(_))
    }
}

/// Symmetric relative difference `|l - r| / mean(|l|, |r|)`, after converting
/// `right` into the unit of `left`. Zero when both are zero.
pub fn relative_difference(left: Quantity, right: Quantity) -> Option<f64> {
    let right = right.convert_to(left.unit)?;
    let scale = (left.value.abs() + right.value.abs()) / 2.0;
    if scale == 0.0 {
        return Some(0.0);
    }
    let diff = (left.value - right.value).abs() / scale;
    diff.is_finite().then_some(diff)
}

/// One line circuit seen side by side in the three sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub key: LineKey,
    /// Ordinal among parallel circuits sharing `key`, from 0.
    pub circuit: usize,
    /// Identifier of the matched entry in each source, `None` when absent.
    pub members: [Option<String>; 3],
    pub(crate) values: [[SourceValue; 3]; 6],
    pub geometries: [Option<[Coordinate; 2]>; 3],
}

impl ComparisonRow {
    pub fn value(&self, parameter: Parameter, source: Source) -> &SourceValue {
        &self.values[parameter.index()][source.index()]
    }

    pub fn values(&self, parameter: Parameter) -> &[SourceValue; 3] {
        &self.values[parameter.index()]
    }

    pub fn member(&self, source: Source) -> Option<&str> {
        self.members[source.index()].as_deref()
    }

    pub fn in_source(&self, source: Source) -> bool {
        self.members[source.index()].is_some()
    }

    /// Number of sources that contain this line.
    pub fn source_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_some()).count()
    }

    /// Geometry from the first source that locates both ends.
    pub fn geometry(&self) -> Option<(Source, [Coordinate; 2])> {
        Source::ALL
            .into_iter()
            .find_map(|s| self.geometries[s.index()].map(|g| (s, g)))
    }

    pub fn difference(&self, parameter: Parameter, left: Source, right: Source) -> Option<f64> {
        let l = self.value(parameter, left).measurement()?;
        let r = self.value(parameter, right).measurement()?;
        relative_difference(l.quantity, r.quantity)
    }

    /// Largest pairwise relative difference of `parameter`, `None` when
    /// fewer than two sources have a value.
    pub fn max_difference(&self, parameter: Parameter) -> Option<f64> {
        Source::PAIRS
            .into_iter()
            .filter_map(|(l, r)| self.difference(parameter, l, r))
            .reduce(f64::max)
    }
}
