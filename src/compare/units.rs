//! Units attached to compared values.
//!
//! The two PyPSA models give susceptance in S while the TSO table gives μS.
//! Values are kept in the unit their source publishes; converting is always an
//! explicit [`Quantity::convert_to`] call, and only within one dimension.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    Impedance,
    Admittance,
    Length,
    Voltage,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    Ohm,
    Siemens,
    Microsiemens,
    Kilometre,
    Kilovolt,
    Megavoltampere,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Ohm => "Ω",
            Unit::Siemens => "S",
            Unit::Microsiemens => "μS",
            Unit::Kilometre => "km",
            Unit::Kilovolt => "kV",
            Unit::Megavoltampere => "MVA",
        }
    }

    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Ohm => Dimension::Impedance,
            Unit::Siemens | Unit::Microsiemens => Dimension::Admittance,
            Unit::Kilometre => Dimension::Length,
            Unit::Kilovolt => Dimension::Voltage,
            Unit::Megavoltampere => Dimension::Power,
        }
    }

    /// Factor to the dimension's reference unit (the first unit listed for it).
    fn scale(self) -> f64 {
        match self {
            Unit::Microsiemens => 1e-6,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A value together with the unit it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Quantity { value, unit }
    }

    /// Re-expresses the quantity in `unit`. Returns `None` across dimensions.
    pub fn convert_to(self, unit: Unit) -> Option<Quantity> {
        if self.unit.dimension() != unit.dimension() {
            return None;
        }
        Some(Quantity {
            value: self.value * self.unit.scale() / unit.scale(),
            unit,
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.value.abs();
        if magnitude != 0.0 && !(1e-2..1e6).contains(&magnitude) {
            write!(f, "{:.3e} {}", self.value, self.unit)
        } else {
            write!(f, "{:.3} {}", self.value, self.unit)
        }
    }
}
