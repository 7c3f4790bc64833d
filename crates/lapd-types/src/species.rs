// ─────────────────────────────────────────────────────────────────────
// LAPD Plasma Analysis — Ion Species
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Particle-property table for the working gases run on the LAPD.

use crate::constants::{ATOMIC_MASS_UNIT, M_ELECTRON};
use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Singly ionized working-gas species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IonSpecies {
    #[serde(rename = "H+")]
    Hydrogen,
    #[serde(rename = "He-4+")]
    Helium4,
    #[serde(rename = "Ne+")]
    Neon20,
    #[serde(rename = "Ar+")]
    Argon40,
}

/// Neutral atomic masses (u).
const A_HYDROGEN: f64 = 1.00782503207;
const A_HELIUM4: f64 = 4.002602;
const A_NEON20: f64 = 19.9924401762;
const A_ARGON40: f64 = 39.9623831237;

impl IonSpecies {
    pub fn from_symbol(symbol: &str) -> AnalysisResult<Self> {
        match symbol {
            "H+" => Ok(IonSpecies::Hydrogen),
            "He-4+" => Ok(IonSpecies::Helium4),
            "Ne+" => Ok(IonSpecies::Neon20),
            "Ar+" => Ok(IonSpecies::Argon40),
            other => Err(AnalysisError::ConfigError(format!(
                "Unknown ion species '{other}'"
            ))),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            IonSpecies::Hydrogen => "H+",
            IonSpecies::Helium4 => "He-4+",
            IonSpecies::Neon20 => "Ne+",
            IonSpecies::Argon40 => "Ar+",
        }
    }

    /// Ion mass (kg): neutral atomic mass minus one electron.
    pub fn mass_kg(&self) -> f64 {
        let atomic_mass = match self {
            IonSpecies::Hydrogen => A_HYDROGEN,
            IonSpecies::Helium4 => A_HELIUM4,
            IonSpecies::Neon20 => A_NEON20,
            IonSpecies::Argon40 => A_ARGON40,
        };
        atomic_mass * ATOMIC_MASS_UNIT - M_ELECTRON
    }
}
