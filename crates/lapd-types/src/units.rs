// ─────────────────────────────────────────────────────────────────────
// LAPD Plasma Analysis — Units
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Tagged physical quantities.
//!
//! A value either carries an explicit [`Unit`] or is dimensionless;
//! conversion is an explicit table lookup within one dimension class,
//! never a runtime attribute probe.

use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimension class of a unit. Conversion is only defined within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Density,
    ColumnDensity,
    Length,
    Time,
    Temperature,
    Velocity,
    Pressure,
    Current,
    Voltage,
}

/// Units encountered in LAPD probe analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    PerCubicMeter,
    PerCubicCentimeter,
    PerSquareCentimeter,
    Meter,
    Centimeter,
    Second,
    Millisecond,
    ElectronVolt,
    MetersPerSecond,
    Pascal,
    Ampere,
    Volt,
}

impl Unit {
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::PerCubicMeter | Unit::PerCubicCentimeter => Dimension::Density,
            Unit::PerSquareCentimeter => Dimension::ColumnDensity,
            Unit::Meter | Unit::Centimeter => Dimension::Length,
            Unit::Second | Unit::Millisecond => Dimension::Time,
            Unit::ElectronVolt => Dimension::Temperature,
            Unit::MetersPerSecond => Dimension::Velocity,
            Unit::Pascal => Dimension::Pressure,
            Unit::Ampere => Dimension::Current,
            Unit::Volt => Dimension::Voltage,
        }
    }

    /// Factor taking a value in this unit to the reference unit of its
    /// dimension class (SI where applicable).
    pub fn si_factor(&self) -> f64 {
        match self {
            Unit::PerCubicMeter => 1.0,
            Unit::PerCubicCentimeter => 1e6,
            Unit::PerSquareCentimeter => 1e4,
            Unit::Meter => 1.0,
            Unit::Centimeter => 1e-2,
            Unit::Second => 1.0,
            Unit::Millisecond => 1e-3,
            Unit::ElectronVolt => 1.0,
            Unit::MetersPerSecond => 1.0,
            Unit::Pascal => 1.0,
            Unit::Ampere => 1.0,
            Unit::Volt => 1.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::PerCubicMeter => "m^-3",
            Unit::PerCubicCentimeter => "cm^-3",
            Unit::PerSquareCentimeter => "cm^-2",
            Unit::Meter => "m",
            Unit::Centimeter => "cm",
            Unit::Second => "s",
            Unit::Millisecond => "ms",
            Unit::ElectronVolt => "eV",
            Unit::MetersPerSecond => "m / s",
            Unit::Pascal => "Pa",
            Unit::Ampere => "A",
            Unit::Volt => "V",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Multiplicative factor converting a value in `from` to a value in `to`.
pub fn conversion_factor(from: Unit, to: Unit) -> AnalysisResult<f64> {
    if from.dimension() != to.dimension() {
        return Err(AnalysisError::UnitMismatch {
            from: from.symbol().to_string(),
            to: to.symbol().to_string(),
        });
    }
    Ok(from.si_factor() / to.si_factor())
}

/// A numeric value with an optional attached unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measured {
    pub value: f64,
    pub unit: Option<Unit>,
}

impl Measured {
    pub fn new(value: f64, unit: Unit) -> Self {
        Measured {
            value,
            unit: Some(unit),
        }
    }

    pub fn dimensionless(value: f64) -> Self {
        Measured { value, unit: None }
    }

    /// Convert to `target`. A dimensionless value cannot be converted.
    pub fn convert_to(&self, target: Unit) -> AnalysisResult<Measured> {
        let unit = self.unit.ok_or_else(|| AnalysisError::UnitMismatch {
            from: "dimensionless".to_string(),
            to: target.symbol().to_string(),
        })?;
        let factor = conversion_factor(unit, target)?;
        Ok(Measured::new(self.value * factor, target))
    }
}
