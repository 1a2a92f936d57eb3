//! Restricting networks and reference records to a named region.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::loader::ReferenceRecord;
use crate::network::{Bus, Coordinate, NetworkModel};

/// Longitude/latitude rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: Coordinate) -> bool {
        (self.min_lon..=self.max_lon).contains(&point.lon)
            && (self.min_lat..=self.max_lat).contains(&point.lat)
    }
}

/// A named area. A bus is inside when it satisfies every constraint that is
/// set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub name: String,
    pub country: Option<String>,
    pub bbox: Option<BoundingBox>,
}

/// Envelope of the 50Hertz control area (Hamburg to the Polish border, Saxony
/// and Thuringia to the Baltic offshore zone).
const FIFTY_HERTZ_BBOX: BoundingBox = BoundingBox {
    min_lon: 9.5,
    min_lat: 50.1,
    max_lon: 15.1,
    max_lat: 55.0,
};

impl Region {
    /// The 50Hertz transmission zone in eastern Germany.
    pub fn fifty_hertz() -> Self {
        Region {
            name: "50Hertz".to_string(),
            country: Some("DE".to_string()),
            bbox: Some(FIFTY_HERTZ_BBOX),
        }
    }

    /// A whole country by ISO 3166 alpha-2 code.
    pub fn country(code: &str) -> Self {
        Region {
            name: code.to_string(),
            country: Some(code.to_string()),
            bbox: None,
        }
    }

    pub fn contains_bus(&self, bus: &Bus) -> bool {
        let in_country = self
            .country
            .as_deref()
            .is_none_or(|c| bus.country.as_deref() == Some(c));
        let in_bbox = self
            .bbox
            .is_none_or(|bbox| bus.coordinate().is_some_and(|p| bbox.contains(p)));
        in_country && in_bbox
    }

    /// Whether a located point lies in the region. Reference records carry no
    /// country, so only the bounding box is checked; a region without one
    /// accepts every point.
    pub fn contains_point(&self, point: Option<Coordinate>) -> bool {
        self.bbox
            .is_none_or(|bbox| point.is_some_and(|p| bbox.contains(p)))
    }

    pub fn contains_record(&self, record: &ReferenceRecord) -> bool {
        record
            .endpoints()
            .into_iter()
            .all(|point| self.contains_point(point))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("50hertz") {
            return Ok(Region::fifty_hertz());
        }
        if s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Ok(Region::country(&s.to_ascii_uppercase()));
        }
        Err(format!(
            "unknown region {s:?}: expected \"50Hertz\" or a two-letter country code"
        ))
    }
}

/// Returns a copy of `network` holding only the buses inside `region` and the
/// lines and links whose both endpoints are kept.
///
/// An empty result is allowed; comparisons against it simply find nothing.
#[tracing::instrument(skip_all, fields(network = network.name(), region = %region))]
pub fn filter_region(network: &NetworkModel, region: &Region) -> NetworkModel {
    let buses: Vec<Bus> = network
        .buses()
        .iter()
        .filter(|bus| region.contains_bus(bus))
        .cloned()
        .collect();

    let kept: HashSet<&str> = buses.iter().map(|bus| bus.id.as_str()).collect();
    let inside = |bus0: &str, bus1: &str| kept.contains(bus0) && kept.contains(bus1);

    let lines = network
        .lines()
        .iter()
        .filter(|line| inside(&line.bus0, &line.bus1))
        .cloned()
        .collect();
    let links = network
        .links()
        .iter()
        .filter(|link| inside(&link.bus0, &link.bus1))
        .cloned()
        .collect();

    let filtered = NetworkModel::from_parts(network.name(), buses, lines, links);

    if filtered.is_empty() {
        warn!("No buses inside region, comparison for this network will be empty");
    } else {
        info!(
            buses = filtered.buses().len(),
            lines = filtered.lines().len(),
            links = filtered.links().len(),
            "Network filtered to region"
        );
    }

    filtered
}

/// Keeps the reference records whose both ends lie inside `region`.
pub fn filter_reference(records: &[ReferenceRecord], region: &Region) -> Vec<ReferenceRecord> {
    let kept: Vec<ReferenceRecord> = records
        .iter()
        .filter(|record| region.contains_record(record))
        .cloned()
        .collect();

    info!(
        region = %region,
        kept = kept.len(),
        dropped = records.len() - kept.len(),
        "Reference records filtered to region"
    );

    kept
}
