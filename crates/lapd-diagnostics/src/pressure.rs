//! Electron pressure from calibrated density and temperature.

use lapd_types::array::LabeledArray;
use lapd_types::constants::Q_ELECTRON;
use lapd_types::error::{AnalysisError, AnalysisResult};
use lapd_types::units::{conversion_factor, Unit};

/// Ideal electron pressure `p = n k_B T` (Pa) from a density field and an
/// electron-temperature field (eV) on the same grid. An untagged density is
/// assumed to be m⁻³; a tagged density is converted explicitly.
pub fn electron_pressure(
    density: &LabeledArray,
    temperature: &LabeledArray,
) -> AnalysisResult<LabeledArray> {
    let to_si = match density.meta.units {
        Some(unit) => conversion_factor(unit, Unit::PerCubicMeter)?,
        None => 1.0,
    };
    if let Some(unit) = temperature.meta.units {
        if unit != Unit::ElectronVolt {
            return Err(AnalysisError::UnitMismatch {
                from: unit.symbol().to_string(),
                to: Unit::ElectronVolt.symbol().to_string(),
            });
        }
    }
    let pressure = density.zip_same(temperature, |n, te| n * to_si * te * Q_ELECTRON)?;
    Ok(pressure.with_units(Unit::Pascal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapd_types::array::AxisCoord;
    use ndarray::array;

    fn field(values: ndarray::Array1<f64>) -> LabeledArray {
        LabeledArray::from_1d(AxisCoord::new("time", array![0.0, 1.0, 2.0]), values).unwrap()
    }

    #[test]
    fn test_pressure_value() {
        let n = field(array![1.0e18, 2.0e18, 1.0e18]).with_units(Unit::PerCubicMeter);
        let te = field(array![5.0, 5.0, 2.5]).with_units(Unit::ElectronVolt);
        let p = electron_pressure(&n, &te).unwrap();
        assert!((p.values[[0]] - 1.0e18 * 5.0 * Q_ELECTRON).abs() < 1e-12);
        assert!((p.values[[1]] - 2.0 * p.values[[0]]).abs() < 1e-12);
        assert_eq!(p.meta.units, Some(Unit::Pascal));
    }

    #[test]
    fn test_pressure_converts_tagged_density() {
        let n_m = field(array![1.0e18, 1.0e18, 1.0e18]).with_units(Unit::PerCubicMeter);
        let n_cm = field(array![1.0e12, 1.0e12, 1.0e12]).with_units(Unit::PerCubicCentimeter);
        let te = field(array![3.0, 3.0, 3.0]).with_units(Unit::ElectronVolt);
        let p_m = electron_pressure(&n_m, &te).unwrap();
        let p_cm = electron_pressure(&n_cm, &te).unwrap();
        for (a, b) in p_m.values.iter().zip(p_cm.values.iter()) {
            assert!((a - b).abs() < 1e-9 * a.abs());
        }
    }

    #[test]
    fn test_pressure_nan_propagates() {
        let n = field(array![1.0e18, f64::NAN, 1.0e18]);
        let te = field(array![5.0, 5.0, f64::NAN]);
        let p = electron_pressure(&n, &te).unwrap();
        assert!(!p.values[[0]].is_nan());
        assert!(p.values[[1]].is_nan());
        assert!(p.values[[2]].is_nan());
    }

    #[test]
    fn test_pressure_rejects_wrong_temperature_unit() {
        let n = field(array![1.0, 1.0, 1.0]);
        let te = field(array![1.0, 1.0, 1.0]).with_units(Unit::Pascal);
        assert!(electron_pressure(&n, &te).is_err());
    }
}
