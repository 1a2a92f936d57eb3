//! Reader for PyPSA networks exported with `export_to_csv_folder`.
//!
//! A folder holds one CSV per component. `buses.csv` must exist; PyPSA skips
//! empty components on export, so missing `lines.csv` or `links.csv` mean
//! "no lines" and "no links".

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::read_rows;
use crate::error::LoadError;
use crate::network::{Bus, Line, Link, NetworkModel};

#[derive(Debug, Deserialize)]
struct BusRow {
    #[serde(rename = "name", alias = "Bus")]
    id: String,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    v_nom: Option<f64>,
    #[serde(default)]
    carrier: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineRow {
    #[serde(rename = "name", alias = "Line")]
    id: String,
    bus0: String,
    bus1: String,
    #[serde(default)]
    r: Option<f64>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    b: Option<f64>,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    s_nom: Option<f64>,
    #[serde(default)]
    num_parallel: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    #[serde(rename = "name", alias = "Link")]
    id: String,
    bus0: String,
    bus1: String,
    #[serde(default)]
    carrier: Option<String>,
    #[serde(default)]
    p_nom: Option<f64>,
    #[serde(default)]
    p_nom_max: Option<f64>,
    #[serde(default)]
    length: Option<f64>,
}

impl From<BusRow> for Bus {
    fn from(row: BusRow) -> Self {
        Bus {
            id: row.id,
            x: row.x.unwrap_or(f64::NAN),
            y: row.y.unwrap_or(f64::NAN),
            v_nom: row.v_nom.unwrap_or(1.0),
            carrier: row.carrier.unwrap_or_else(|| "AC".to_string()),
            country: row.country.filter(|c| !c.is_empty()),
        }
    }
}

impl From<LineRow> for Line {
    fn from(row: LineRow) -> Self {
        Line {
            id: row.id,
            bus0: row.bus0,
            bus1: row.bus1,
            r: row.r.unwrap_or(0.0),
            x: row.x.unwrap_or(0.0),
            b: row.b.unwrap_or(0.0),
            length: row.length.unwrap_or(0.0),
            s_nom: row.s_nom.unwrap_or(0.0),
            num_parallel: row.num_parallel.unwrap_or(1.0),
            v_nom: None,
            country: None,
        }
    }
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link {
            id: row.id,
            bus0: row.bus0,
            bus1: row.bus1,
            carrier: row.carrier.unwrap_or_default(),
            p_nom: row.p_nom.unwrap_or(0.0),
            p_nom_max: row.p_nom_max.unwrap_or(f64::INFINITY),
            length: row.length.unwrap_or(0.0),
            country: None,
        }
    }
}

/// Locates `<dir>/<component>.csv`, falling back to `<component>.csv.gz`.
fn component_file(dir: &Path, component: &str) -> Option<PathBuf> {
    [format!("{component}.csv"), format!("{component}.csv.gz")]
        .into_iter()
        .map(|file| dir.join(file))
        .find(|path| path.is_file())
}

/// Loads a PyPSA CSV folder into a [`NetworkModel`] named `name` and derives
/// the per-branch country and voltage level.
///
/// # Errors
///
/// Returns a [`LoadError`] if the folder or its `buses.csv` is missing, a
/// table is malformed, or a branch references an unknown bus.
#[tracing::instrument(skip(dir), fields(path = %dir.display()))]
pub fn load_network(dir: &Path, name: &str) -> Result<NetworkModel, LoadError> {
    if !dir.exists() {
        return Err(LoadError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(LoadError::io(
            dir,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "expected a PyPSA CSV folder",
            ),
        ));
    }

    let buses_path =
        component_file(dir, "buses").ok_or_else(|| LoadError::NotFound(dir.join("buses.csv")))?;
    let buses: Vec<Bus> = read_rows::<BusRow>(&buses_path)?
        .into_iter()
        .map(Bus::from)
        .collect();

    let lines: Vec<Line> = match component_file(dir, "lines") {
        Some(path) => read_rows::<LineRow>(&path)?
            .into_iter()
            .map(Line::from)
            .collect(),
        None => {
            debug!("No lines table, network has no lines");
            Vec::new()
        }
    };

    let links: Vec<Link> = match component_file(dir, "links") {
        Some(path) => read_rows::<LinkRow>(&path)?
            .into_iter()
            .map(Link::from)
            .collect(),
        None => {
            debug!("No links table, network has no links");
            Vec::new()
        }
    };

    let mut network = NetworkModel::from_parts(name, buses, lines, links);
    network.calculate_dependent_values()?;

    info!(
        network = name,
        buses = network.buses().len(),
        lines = network.lines().len(),
        links = network.links().len(),
        "Network loaded"
    );

    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_network_minimal_folder() {
        let dir = temp_dir("grid_benchmark_pypsa_minimal");
        fs::write(
            dir.join("buses.csv"),
            "Bus,v_nom,x,y,carrier,country\nb1,380,13.4,52.5,AC,DE\nb2,220,14.0,53.0,AC,DE\n",
        )
        .unwrap();
        fs::write(
            dir.join("lines.csv"),
            "Line,bus0,bus1,r,x,b,s_nom,length,num_parallel,type\nl1,b2,b1,4.0,40.0,0.0001,1700,50,2,Al/St 240/40 4-bundle 380.0\n",
        )
        .unwrap();

        let n = load_network(&dir, "eur").unwrap();

        assert_eq!(n.name(), "eur");
        assert_eq!(n.buses().len(), 2);
        assert!(n.links().is_empty());
        let line = &n.lines()[0];
        assert_eq!(line.r, 4.0);
        assert_eq!(line.num_parallel, 2.0);
        assert_eq!(line.v_nom, Some(220.0));
        assert_eq!(line.country.as_deref(), Some("DE"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_fields_use_pypsa_defaults() {
        let dir = temp_dir("grid_benchmark_pypsa_defaults");
        fs::write(dir.join("buses.csv"), "name,x,y\nb1,,\nb2,1,2\n").unwrap();
        fs::write(dir.join("links.csv"), "name,bus0,bus1,p_nom\nk1,b1,b2,\n").unwrap();

        let n = load_network(&dir, "earth").unwrap();

        let b1 = n.bus("b1").unwrap();
        assert!(b1.coordinate().is_none());
        assert_eq!(b1.carrier, "AC");
        assert_eq!(b1.v_nom, 1.0);
        assert!(b1.country.is_none());
        assert_eq!(n.links()[0].p_nom, 0.0);
        assert!(n.links()[0].p_nom_max.is_infinite());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_folder_is_not_found() {
        let err = load_network(Path::new("/nonexistent/grid_benchmark"), "eur").unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn test_missing_buses_table_is_not_found() {
        let dir = temp_dir("grid_benchmark_pypsa_no_buses");
        fs::write(dir.join("lines.csv"), "name,bus0,bus1\nl1,a,b\n").unwrap();

        let err = load_network(&dir, "eur").unwrap_err();
        assert!(matches!(err, LoadError::NotFound(ref p) if p.ends_with("buses.csv")));

        fs::remove_dir_all(&dir).unwrap();
    }
}
