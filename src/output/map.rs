//! Map layers for the report, serialized to JSON and drawn by Leaflet.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;
use tracing::{debug, info};

use super::html::escape;
use super::{SourceLabels, mismatch_color};
use crate::compare::{ComparisonRow, Parameter, Source};
use crate::loader::ReferenceRecord;
use crate::network::{Coordinate, NetworkModel};
use crate::region::Region;

/// Roughly the middle of Germany, used when nothing else locates the map.
const FALLBACK_CENTER: Coordinate = Coordinate {
    lat: 51.16,
    lon: 10.45,
};

#[derive(Debug, Serialize)]
pub struct Marker {
    pub position: Coordinate,
    pub color: &'static str,
    pub popup: String,
}

#[derive(Debug, Serialize)]
pub struct Polyline {
    pub path: [Coordinate; 2],
    pub color: &'static str,
    pub popup: String,
}

/// A toggleable overlay. `name` is HTML-escaped already.
#[derive(Debug, Serialize)]
pub struct MapLayer {
    pub name: String,
    pub visible: bool,
    pub markers: Vec<Marker>,
    pub polylines: Vec<Polyline>,
}

impl MapLayer {
    fn new(name: &str, visible: bool) -> Self {
        MapLayer {
            name: escape(name),
            visible,
            markers: Vec::new(),
            polylines: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MapData {
    pub center: Coordinate,
    pub zoom: u8,
    pub layers: Vec<MapLayer>,
}

fn comparison_popup(row: &ComparisonRow, labels: &SourceLabels, highlight: Parameter) -> String {
    let mut popup = format!("<b>{}</b>", escape(&row.key.to_string()));
    if row.circuit > 0 {
        let _ = write!(popup, " (circuit {})", row.circuit + 1);
    }
    popup.push_str("<br>");

    for parameter in Parameter::ALL {
        let _ = write!(popup, "{}:", escape(parameter.symbol()));
        for source in Source::ALL {
            let value = row
                .value(parameter, source)
                .measurement()
                .map(|m| m.quantity.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            let _ = write!(popup, " {} {} |", escape(labels.get(source)), escape(&value));
        }
        popup.pop();
        popup.push_str("<br>");
    }

    match row.max_difference(highlight) {
        Some(diff) => {
            let _ = write!(popup, "max Δ {}: {:.1} %", highlight.symbol(), diff * 100.0);
        }
        None => {
            let _ = write!(popup, "max Δ {}: fewer than two sources", highlight.symbol());
        }
    }
    popup
}

/// One polyline per row, colored by the mismatch of `highlight`. Rows whose
/// geometry no source can provide are left out; their count is returned.
pub fn comparison_layer(
    rows: &[ComparisonRow],
    labels: &SourceLabels,
    highlight: Parameter,
) -> (MapLayer, usize) {
    let mut layer = MapLayer::new(&format!("Comparison ({highlight})"), true);
    let mut skipped = 0;

    for row in rows {
        let Some((_, path)) = row.geometry() else {
            debug!(line = %row.key, circuit = row.circuit, "No geometry, skipped on map");
            skipped += 1;
            continue;
        };
        layer.polylines.push(Polyline {
            path,
            color: mismatch_color(row.max_difference(highlight)),
            popup: comparison_popup(row, labels, highlight),
        });
    }

    (layer, skipped)
}

/// Bus, line and link layers of one network, hidden by default.
pub fn network_layers(network: &NetworkModel, label: &str, color: &'static str) -> Vec<MapLayer> {
    let mut buses = MapLayer::new(&format!("{label} buses"), false);
    for bus in network.buses().iter().filter(|b| b.is_electric()) {
        if let Some(position) = bus.coordinate() {
            buses.markers.push(Marker {
                position,
                color,
                popup: escape(&bus.id),
            });
        }
    }

    let mut lines = MapLayer::new(&format!("{label} lines"), false);
    for line in network.lines() {
        if let Some(path) = network.branch_geometry(&line.bus0, &line.bus1) {
            let kv = line.v_nom.map(|v| v.to_string()).unwrap_or_default();
            lines.polylines.push(Polyline {
                path,
                color,
                popup: format!(
                    "<b>{}</b><br>s_nom: {} <br>length: {} <br>kV: {} <br>r: {}<br>x: {}",
                    escape(&line.id),
                    line.s_nom,
                    line.length,
                    kv,
                    line.r,
                    line.x
                ),
            });
        }
    }

    let mut links = MapLayer::new(&format!("{label} links"), false);
    for link in network.links() {
        if !matches!(link.carrier.as_str(), "AC" | "DC") {
            continue;
        }
        if let Some(path) = network.branch_geometry(&link.bus0, &link.bus1) {
            links.polylines.push(Polyline {
                path,
                color,
                popup: format!(
                    "<b>{}</b><br>p_nom: {}<br>p_nom_max: {}",
                    escape(&link.id),
                    link.p_nom,
                    link.p_nom_max
                ),
            });
        }
    }

    vec![buses, lines, links]
}

/// Substation markers (one per name) and line layers of the reference table.
pub fn reference_layers(records: &[ReferenceRecord], label: &str, color: &'static str) -> Vec<MapLayer> {
    let mut substations = MapLayer::new(&format!("{label} substations"), false);
    let mut seen: HashSet<&str> = HashSet::new();

    for record in records {
        let ends = [record.sub1.as_str(), record.sub2.as_str()];
        for (name, position) in ends.into_iter().zip(record.endpoints()) {
            let Some(position) = position else { continue };
            if seen.insert(name) {
                substations.markers.push(Marker {
                    position,
                    color,
                    popup: escape(name),
                });
            }
        }
    }

    let show = |v: Option<f64>| v.map(|v| format!("{v:.3}")).unwrap_or_default();
    let mut lines = MapLayer::new(&format!("{label} lines"), false);
    for record in records {
        if let Some(path) = record.geometry() {
            lines.polylines.push(Polyline {
                path,
                color,
                popup: format!(
                    "<b>{}</b><br>s_nom: {} <br>length: {} <br>kV: {} <br>r: {}<br>x: {}",
                    escape(&record.line_name()),
                    show(record.mva),
                    show(record.length),
                    show(record.kv),
                    show(record.r),
                    show(record.x)
                ),
            });
        }
    }

    vec![substations, lines]
}

fn center(region: &Region, layer: &MapLayer) -> Coordinate {
    if let Some(bbox) = region.bbox {
        return Coordinate {
            lat: (bbox.min_lat + bbox.max_lat) / 2.0,
            lon: (bbox.min_lon + bbox.max_lon) / 2.0,
        };
    }

    let points: Vec<&Coordinate> = layer.polylines.iter().flat_map(|p| p.path.iter()).collect();
    if points.is_empty() {
        return FALLBACK_CENTER;
    }
    let n = points.len() as f64;
    Coordinate {
        lat: points.iter().map(|p| p.lat).sum::<f64>() / n,
        lon: points.iter().map(|p| p.lon).sum::<f64>() / n,
    }
}

/// Everything the report map shows, plus the number of rows left off it.
pub struct MapInput<'a> {
    pub rows: &'a [ComparisonRow],
    pub a: &'a NetworkModel,
    pub b: &'a NetworkModel,
    pub reference: &'a [ReferenceRecord],
}

pub fn build_map(
    input: &MapInput<'_>,
    labels: &SourceLabels,
    region: &Region,
    highlight: Parameter,
) -> (MapData, usize) {
    let (comparison, skipped) = comparison_layer(input.rows, labels, highlight);
    if skipped > 0 {
        info!(skipped, "Rows without geometry left off the map");
    }

    let center = center(region, &comparison);
    let mut layers = vec![comparison];
    layers.extend(network_layers(input.a, labels.get(Source::A), "gray"));
    layers.extend(network_layers(input.b, labels.get(Source::B), "black"));
    layers.extend(reference_layers(input.reference, labels.get(Source::Reference), "red"));

    (
        MapData {
            center,
            zoom: if region.bbox.is_some() { 7 } else { 5 },
            layers,
        },
        skipped,
    )
}
