//! In-memory grid model: buses, lines and links addressed by string keys.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::LoadError;

/// A WGS84 point. Only constructed from finite values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        (lat.is_finite() && lon.is_finite()).then_some(Coordinate { lat, lon })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bus {
    pub id: String,
    /// Longitude.
    pub x: f64,
    /// Latitude.
    pub y: f64,
    pub v_nom: f64,
    pub carrier: String,
    pub country: Option<String>,
}

impl Bus {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.y, self.x)
    }

    /// AC and DC buses are substations; other carriers are storage or
    /// generation helpers that PyPSA models attach to the grid.
    pub fn is_electric(&self) -> bool {
        matches!(self.carrier.as_str(), "AC" | "DC")
    }
}

/// A transmission line. `r` and `x` are in Ω, `b` in S, `length` in km,
/// `s_nom` in MVA.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub id: String,
    pub bus0: String,
    pub bus1: String,
    pub r: f64,
    pub x: f64,
    pub b: f64,
    pub length: f64,
    pub s_nom: f64,
    /// Number of identical circuits the line stands for. `r`, `x`, `b` and
    /// `s_nom` are the equivalent of all of them together.
    pub num_parallel: f64,
    pub v_nom: Option<f64>,
    pub country: Option<String>,
}

impl Line {
    /// Whole number of circuits to split the line into. Fractional counts,
    /// which clustered networks produce, cannot be split and count as one.
    pub fn circuits(&self) -> usize {
        let n = self.num_parallel.round();
        if n >= 2.0 && (self.num_parallel - n).abs() < 1e-6 {
            n as usize
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub id: String,
    pub bus0: String,
    pub bus1: String,
    pub carrier: String,
    pub p_nom: f64,
    pub p_nom_max: f64,
    pub length: f64,
    pub country: Option<String>,
}

/// A loaded network. Read-only once dependent values are calculated.
#[derive(Debug, Clone, Default)]
pub struct NetworkModel {
    name: String,
    buses: Vec<Bus>,
    lines: Vec<Line>,
    links: Vec<Link>,
    bus_index: HashMap<String, usize>,
}

impl NetworkModel {
    pub fn new(name: &str) -> Self {
        NetworkModel {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Builds a model from its component tables. Later buses with a duplicate
    /// id shadow earlier ones in lookups.
    pub fn from_parts(name: &str, buses: Vec<Bus>, lines: Vec<Line>, links: Vec<Link>) -> Self {
        let bus_index = buses
            .iter()
            .enumerate()
            .map(|(i, bus)| (bus.id.clone(), i))
            .collect();

        NetworkModel {
            name: name.to_string(),
            buses,
            lines,
            links,
            bus_index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn bus(&self, id: &str) -> Option<&Bus> {
        self.bus_index.get(id).map(|&i| &self.buses[i])
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// Derives per-branch attributes from the `bus0` end: the country of
    /// lines and links, and the nominal voltage of lines.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::DanglingBus`] when a branch names a bus that is
    /// not in the bus table.
    pub fn calculate_dependent_values(&mut self) -> Result<(), LoadError> {
        for line in &mut self.lines {
            let bus0 = lookup(&self.bus_index, &self.buses, &self.name, "line", &line.id, &line.bus0)?;
            lookup(&self.bus_index, &self.buses, &self.name, "line", &line.id, &line.bus1)?;
            line.country = bus0.country.clone();
            line.v_nom = Some(bus0.v_nom);
        }

        for link in &mut self.links {
            let bus0 = lookup(&self.bus_index, &self.buses, &self.name, "link", &link.id, &link.bus0)?;
            lookup(&self.bus_index, &self.buses, &self.name, "link", &link.id, &link.bus1)?;
            link.country = bus0.country.clone();
        }

        Ok(())
    }

    /// Endpoint coordinates of a branch between `bus0` and `bus1`, if both
    /// buses exist and are located.
    pub fn branch_geometry(&self, bus0: &str, bus1: &str) -> Option<[Coordinate; 2]> {
        let from = self.bus(bus0)?.coordinate()?;
        let to = self.bus(bus1)?.coordinate()?;
        Some([from, to])
    }
}

fn lookup<'a>(
    index: &HashMap<String, usize>,
    buses: &'a [Bus],
    network: &str,
    component: &'static str,
    id: &str,
    bus: &str,
) -> Result<&'a Bus, LoadError> {
    index
        .get(bus)
        .map(|&i| &buses[i])
        .ok_or_else(|| LoadError::DanglingBus {
            network: network.to_string(),
            component,
            id: id.to_string(),
            bus: bus.to_string(),
        })
}
