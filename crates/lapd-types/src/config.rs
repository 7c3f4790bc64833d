// ─────────────────────────────────────────────────────────────────────
// LAPD Plasma Analysis — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::AnalysisResult;
use crate::species::IonSpecies;
use serde::{Deserialize, Serialize};

/// Inclusive range of steady-state plateau indices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlateauRange {
    pub start: i64,
    pub end: i64,
}

impl PlateauRange {
    pub fn new(start: i64, end: i64) -> Self {
        PlateauRange { start, end }
    }

    /// Inclusive containment test against a plateau coordinate value.
    pub fn contains(&self, plateau: f64) -> bool {
        plateau >= self.start as f64 && plateau <= self.end as f64
    }
}

/// Parameters of one interferometry calibration run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Radius of the core region (cm).
    #[serde(default = "default_core_radius_cm")]
    pub core_radius_cm: f64,
    /// Steady-state plateau window.
    pub steady_state: PlateauRange,
}

/// Top-level analysis run configuration.
/// Immutable record passed into components; replaces scattered run-script
/// globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub experiment_name: String,
    #[serde(default = "default_core_radius_cm")]
    pub core_radius_cm: f64,
    pub steady_state: PlateauRange,
    #[serde(default = "default_ion_species")]
    pub ion_species: IonSpecies,
    /// Fit a two-temperature electron population upstream.
    #[serde(default)]
    pub bimaxwellian: bool,
    /// Path to the raw interferometry trace archive, when calibration is
    /// desired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interferometry_path: Option<String>,
}

fn default_core_radius_cm() -> f64 {
    26.0
}

fn default_ion_species() -> IonSpecies {
    IonSpecies::Helium4
}

impl AnalysisConfig {
    /// Load from JSON file.
    pub fn from_file(path: &str) -> AnalysisResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn calibration(&self) -> CalibrationConfig {
        CalibrationConfig {
            core_radius_cm: self.core_radius_cm,
            steady_state: self.steady_state,
        }
    }
}
