//! Fixed inputs of an analysis run and their resolved form.

use std::path::PathBuf;

use crate::compare::Parameter;
use crate::output::SourceLabels;
use crate::region::Region;

/// PyPSA-Eur base network, exported as a CSV folder.
pub const EUR_NETWORK: &str = "data/base_eur";
/// PyPSA-Earth base network, exported as a CSV folder.
pub const EARTH_NETWORK: &str = "data/base_earth";
/// 50Hertz static grid model.
pub const REFERENCE_TABLE: &str = "data/StatischesNetzmodell_Datentabelle2023.csv";
pub const REPORT_PATH: &str = "grid-comparison.html";
pub const REGION: &str = "50Hertz";
pub const HIGHLIGHT: &str = "resistance";
pub const REPORT_TITLE: &str = "PyPSA-Eur and PyPSA-Earth against the 50Hertz static grid model";

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub eur_network: PathBuf,
    pub earth_network: PathBuf,
    pub reference: PathBuf,
    pub output: PathBuf,
    /// Also export the comparison table as CSV.
    pub csv: Option<PathBuf>,
    pub region: Region,
    /// Parameter whose mismatch colors the map.
    pub highlight: Parameter,
    /// Collapse parallel reference circuits into one equivalent line.
    pub merge_parallel: bool,
    /// Drop reference lines with an end outside the region's bounding box.
    pub filter_reference: bool,
    pub labels: SourceLabels,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            eur_network: PathBuf::from(EUR_NETWORK),
            earth_network: PathBuf::from(EARTH_NETWORK),
            reference: PathBuf::from(REFERENCE_TABLE),
            output: PathBuf::from(REPORT_PATH),
            csv: None,
            region: Region::fifty_hertz(),
            highlight: Parameter::Resistance,
            merge_parallel: false,
            filter_reference: false,
            labels: SourceLabels::default(),
        }
    }
}
