//! Interferometry time alignment and absolute density calibration.
//!
//! The swept-probe density field and the interferometer trace observe the
//! same plasma on independent clocks with different cadences. Both see the
//! end-of-discharge density collapse; matching the collapse times
//! synchronizes the clocks, after which the trace is re-binned onto the
//! probe time grid and the ratio of line-integrated densities gives an
//! absolute scaling factor.

use lapd_math::integrate::trapezoid;
use lapd_math::interp::{fill_gaps_linear, gradient_1d};
use lapd_math::rebin::{bucket_mean, mean_step};
use lapd_types::array::LabeledArray;
use lapd_types::config::CalibrationConfig;
use lapd_types::error::{AnalysisError, AnalysisResult};
use lapd_types::units::{conversion_factor, Unit};
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use ndarray_npy::NpzReader;
use std::fs::File;
use std::path::Path;

/// Interferometer area normalization (cm⁻² per raw count). Instrument
/// calibration constant, not tunable.
pub const AREA_FACTOR_PER_CM2: f64 = 8.0e13;

/// Interferometer sample period (s). Instrument calibration constant.
pub const SAMPLE_PERIOD_S: f64 = 4.88e-5;

/// Maximum x-coordinate gap (cm) filled by linear interpolation before
/// line integration. Wider gaps stay undefined.
const MAX_GAP_CM: f64 = 10.0;

/// Line integrals smaller than this in magnitude yield NaN scaling factors.
const NEAR_ZERO: f64 = 1e-30;

/// One interferometer trace in physical units, on its own clock.
#[derive(Debug, Clone)]
pub struct InterferometryTrace {
    /// Line-integrated density (cm⁻²).
    pub values: Array1<f64>,
    /// Sample times (ms).
    pub times_ms: Array1<f64>,
}

impl InterferometryTrace {
    /// Load a raw trace block from a `.npz` archive. The archive must hold a
    /// 2-D `trace` entry; the leading axis is averaged away.
    pub fn from_npz(path: &Path) -> AnalysisResult<Self> {
        let file = File::open(path)?;
        let mut npz = NpzReader::new(file).map_err(|e| {
            AnalysisError::Archive(format!("failed to open '{}': {e}", path.display()))
        })?;
        let raw: Array2<f64> = npz.by_name("trace").map_err(|e| {
            AnalysisError::Archive(format!("no 'trace' block in '{}': {e}", path.display()))
        })?;
        Self::from_raw(&raw)
    }

    /// Build from a raw 2-D capture block.
    pub fn from_raw(raw: &Array2<f64>) -> AnalysisResult<Self> {
        if raw.is_empty() {
            return Err(AnalysisError::ShapeMismatch(
                "interferometer trace block is empty".to_string(),
            ));
        }
        let means = raw.mean_axis(Axis(0)).ok_or_else(|| {
            AnalysisError::ShapeMismatch("interferometer trace block has no rows".to_string())
        })?;
        let samples = Array1::from_iter((0..means.len()).map(|k| k as f64));
        let (values, times_ms) = to_real_units(&means, &samples)?;
        Ok(InterferometryTrace { values, times_ms })
    }
}

/// Convert an averaged raw trace and its sample indices to physical units
/// (cm⁻², ms) using the two fixed instrument constants.
pub fn to_real_units(
    means: &Array1<f64>,
    samples: &Array1<f64>,
) -> AnalysisResult<(Array1<f64>, Array1<f64>)> {
    let ms_per_s = conversion_factor(Unit::Second, Unit::Millisecond)?;
    Ok((
        means * AREA_FACTOR_PER_CM2,
        samples * (SAMPLE_PERIOD_S * ms_per_s),
    ))
}

/// Result of one interferometry calibration.
#[derive(Debug, Clone)]
pub struct Calibration {
    /// Per-axis scaling factors, keyed by the integrated spatial axis.
    pub scale: Vec<(String, LabeledArray)>,
    pub has_x: bool,
    pub has_y: bool,
    /// Calibrated density (m⁻³), defined only inside the steady-state
    /// plateau window.
    pub calibrated_density: LabeledArray,
}

/// Calibrate a swept-probe density field against a raw interferometer trace
/// read from `trace_path`.
pub fn interferometry_calibration(
    density: &LabeledArray,
    trace_path: &Path,
    config: &CalibrationConfig,
) -> AnalysisResult<Calibration> {
    let trace = InterferometryTrace::from_npz(trace_path)?;
    calibrate_with_trace(density, &trace, config)
}

/// Calibrate against an already-loaded trace.
///
/// The density field must carry a `time` axis with a `plateau` auxiliary
/// coordinate, values in m⁻³, and at least one resolved spatial axis.
/// Numeric degeneracies (zero line integrals, empty re-bin buckets) yield
/// NaN, never an error.
pub fn calibrate_with_trace(
    density: &LabeledArray,
    trace: &InterferometryTrace,
    config: &CalibrationConfig,
) -> AnalysisResult<Calibration> {
    let time = density.axis("time")?.clone();
    let has_x = density.size_of("x") > 1;
    let has_y = density.size_of("y") > 1;
    if !has_x && !has_y {
        return Err(AnalysisError::ConfigError(
            "density field has no resolved spatial axis to line-integrate".to_string(),
        ));
    }
    if has_x && has_y {
        warn!(
            "two-dimensional interferometry calibration is incomplete and may give \
             inaccurate or unexpected results"
        );
    }

    let per_cm3 = conversion_factor(Unit::PerCubicMeter, Unit::PerCubicCentimeter)?;
    let density_cm = density
        .map(|v| v * per_cm3)
        .with_units(Unit::PerCubicCentimeter);

    // Core region only: |x| and |y| inside the configured radius
    let radius = config.core_radius_cm;
    let mut core = density_cm;
    for axis in ["x", "y"] {
        if core.has_axis(axis) {
            core = core.select_axis(axis, |c| c.abs() < radius)?;
        }
    }
    let core = if core.has_axis("x") {
        fill_gaps_linear(&core, "x", MAX_GAP_CM)?
    } else {
        core
    };

    // Interferometer collapse: time of steepest negative slope
    let slope = gradient_1d(&trace.values, &trace.times_ms);
    let inter_collapse = argmin_coord(&slope, &trace.times_ms).ok_or_else(|| {
        AnalysisError::ShapeMismatch("interferometer trace is entirely undefined".to_string())
    })?;
    let dt = mean_step(&time.values);

    let mut scale = Vec::new();
    for (active, axis) in [(has_x, "x"), (has_y, "y")] {
        if !active {
            continue;
        }
        let integral = trapezoid(&core, axis)?;
        let density_collapse = collapse_time(&integral)?;
        debug!(
            "axis {axis}: density collapse at {density_collapse:.3} ms, \
             interferometer collapse at {inter_collapse:.3} ms"
        );

        // Shift the trace clock so the two collapses coincide, then crunch
        // the trace into buckets of half a probe time step
        let shifted = trace
            .times_ms
            .mapv(|t| t - inter_collapse + density_collapse);
        let binned = bucket_mean(&shifted, &trace.values, &time.values, dt / 2.0);
        let binned_da = LabeledArray::from_1d(time.clone(), binned)?;

        let factor = integral.broadcast_with(&binned_da, |integ, inter| {
            if !integ.is_finite() || integ.abs() < NEAR_ZERO {
                f64::NAN
            } else {
                inter / integ
            }
        })?;
        scale.push((axis.to_string(), factor));
    }

    // Apply each factor to the original (unrestricted) field; with both axes
    // active the two applications are averaged elementwise
    let mut applied = Vec::with_capacity(scale.len());
    for (_, factor) in &scale {
        applied.push(density.broadcast_with(factor, |d, s| d * s)?);
    }
    let combined = match applied.len() {
        0 => {
            return Err(AnalysisError::ConfigError(
                "no scaling factor could be derived".to_string(),
            ))
        }
        1 => applied.swap_remove(0),
        _ => applied[0].zip_same(&applied[1], |a, b| 0.5 * (a + b))?,
    };

    let range = config.steady_state;
    let calibrated_density = combined
        .mask_axis_aux("time", "plateau", |p| range.contains(p))?
        .with_units(Unit::PerCubicMeter);

    Ok(Calibration {
        scale,
        has_x,
        has_y,
        calibrated_density,
    })
}

/// Coordinate of the minimum value, skipping NaN.
fn argmin_coord(values: &Array1<f64>, coords: &Array1<f64>) -> Option<f64> {
    let mut best: Option<(usize, f64)> = None;
    for (k, &v) in values.iter().enumerate() {
        if !v.is_nan() && best.map(|(_, bv)| v < bv).unwrap_or(true) {
            best = Some((k, v));
        }
    }
    best.map(|(k, _)| coords[k])
}

/// Time of the line-integral maximum, averaged over any secondary axis.
fn collapse_time(integral: &LabeledArray) -> AnalysisResult<f64> {
    let i = integral
        .axis_index("time")
        .ok_or_else(|| AnalysisError::MissingAxis {
            axis: "time".to_string(),
            context: "line integral".to_string(),
        })?;
    let coords = integral.axes[i].values.clone();
    let mut sum = 0.0;
    let mut count = 0usize;
    for lane in integral.values.lanes(Axis(i)) {
        let mut best: Option<(usize, f64)> = None;
        for (k, &v) in lane.iter().enumerate() {
            if !v.is_nan() && best.map(|(_, bv)| v > bv).unwrap_or(true) {
                best = Some((k, v));
            }
        }
        if let Some((k, _)) = best {
            sum += coords[k];
            count += 1;
        }
    }
    if count == 0 {
        Err(AnalysisError::ConfigError(
            "line integral entirely undefined; cannot locate density collapse".to_string(),
        ))
    } else {
        Ok(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapd_types::array::AxisCoord;
    use lapd_types::config::PlateauRange;
    use ndarray::{array, Array3};

    /// Triangular discharge profile: linear rise to the peak at t = 5 ms,
    /// linear fall back to zero at t = 10 ms.
    fn discharge(t: f64) -> f64 {
        if t < 0.0 || t > 10.0 {
            0.0
        } else if t <= 5.0 {
            t / 5.0
        } else {
            1.0 - (t - 5.0) / 5.0
        }
    }

    fn plateau_axis(times: &Array1<f64>) -> AxisCoord {
        let plateaus = Array1::from_iter((1..=times.len()).map(|p| p as f64));
        AxisCoord::new("time", times.clone()).with_aux("plateau", plateaus)
    }

    #[test]
    fn test_to_real_units_roundtrip() {
        let means = array![1.0, 2.5, -0.5];
        let samples = array![0.0, 1.0, 2.0];
        let (values, times) = to_real_units(&means, &samples).unwrap();
        // Dividing the fixed constants back out recovers the raw values
        for (raw, &v) in means.iter().zip(values.iter()) {
            assert!((v / AREA_FACTOR_PER_CM2 - raw).abs() < 1e-12);
        }
        for (raw, &t) in samples.iter().zip(times.iter()) {
            assert!((t / (SAMPLE_PERIOD_S * 1e3) - raw).abs() < 1e-12);
        }
    }

    #[test]
    fn test_from_raw_averages_leading_axis() {
        let raw = array![[1.0, 3.0], [3.0, 5.0]];
        let trace = InterferometryTrace::from_raw(&raw).unwrap();
        assert!((trace.values[0] - 2.0 * AREA_FACTOR_PER_CM2).abs() < 1e-3);
        assert!((trace.values[1] - 4.0 * AREA_FACTOR_PER_CM2).abs() < 1e-3);
        assert!((trace.times_ms[1] - 0.0488).abs() < 1e-12);
    }

    #[test]
    fn test_from_raw_empty_rejected() {
        let raw = Array2::<f64>::zeros((0, 0));
        assert!(InterferometryTrace::from_raw(&raw).is_err());
    }

    #[test]
    fn test_scaling_factor_near_unity_for_common_signal() {
        // Density field and trace built from the same physical signal, with
        // the trace on a fine clock offset by +2 ms
        let nx = 21;
        let x = Array1::linspace(-20.0, 20.0, nx);
        let times = Array1::linspace(0.0, 10.0, 11);
        let density = Array2::from_shape_fn((nx, 11), |(_, j)| {
            discharge(times[j]) * 1e6 // m^-3 so that the cm^-3 value is s(t)
        })
        .into_dyn();
        let da = LabeledArray::new(
            density,
            vec![AxisCoord::new("x", x), plateau_axis(&times)],
        )
        .unwrap();

        let trace_times = Array1::linspace(0.0, 12.0, 241);
        let trace = InterferometryTrace {
            values: trace_times.mapv(|t| 40.0 * discharge(t - 2.0)),
            times_ms: trace_times,
        };

        let config = CalibrationConfig {
            core_radius_cm: 26.0,
            steady_state: PlateauRange::new(1, 11),
        };
        let cal = calibrate_with_trace(&da, &trace, &config).unwrap();
        assert!(cal.has_x);
        assert!(!cal.has_y);
        assert_eq!(cal.scale.len(), 1);

        let (axis, factor) = &cal.scale[0];
        assert_eq!(axis, "x");
        let finite: Vec<f64> = factor
            .values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        assert!(finite.len() >= 8, "only {} finite factors", finite.len());
        for &f in &finite {
            assert!(f > 0.0, "scaling factor must be positive, got {f}");
            assert!(
                (0.85..=1.15).contains(&f),
                "scaling factor {f} outside tolerance of 1.0"
            );
        }
    }

    #[test]
    fn test_constant_signal_end_to_end() {
        // Line integral exactly 2.0, trace exactly 4.0 on the same grid:
        // factor must be uniformly 2.0 and calibrated density 5.0 → 10.0
        // inside the steady-state window, undefined outside
        let times = Array1::linspace(0.0, 9.0, 10);
        let x = array![-2.0e5, 2.0e5]; // cm; spans chosen so ∫ 5e-6 dx = 2.0
        let density = Array2::from_elem((2, 10), 5.0).into_dyn();
        let da = LabeledArray::new(
            density,
            vec![AxisCoord::new("x", x), plateau_axis(&times)],
        )
        .unwrap();

        let trace = InterferometryTrace {
            values: Array1::from_elem(10, 4.0),
            times_ms: times.clone(),
        };
        let config = CalibrationConfig {
            core_radius_cm: 1.0e9,
            steady_state: PlateauRange::new(3, 6),
        };
        let cal = calibrate_with_trace(&da, &trace, &config).unwrap();

        let (_, factor) = &cal.scale[0];
        for &f in factor.values.iter() {
            assert!((f - 2.0).abs() < 1e-9, "factor = {f}");
        }
        for i in 0..2 {
            for j in 0..10 {
                let plateau = (j + 1) as f64;
                let v = cal.calibrated_density.values[[i, j]];
                if (3.0..=6.0).contains(&plateau) {
                    assert!((v - 10.0).abs() < 1e-9, "calibrated value {v} at plateau {plateau}");
                } else {
                    assert!(v.is_nan(), "expected NaN outside steady state, got {v}");
                }
            }
        }
    }

    #[test]
    fn test_noisy_trace_keeps_positive_factor() {
        use rand_distr::{Distribution, Normal};
        let mut rng = rand::thread_rng();
        let noise = Normal::new(0.0, 0.2).unwrap();

        // Slow ramp to the peak at 8 ms, abrupt collapse over 0.4 ms; the
        // collapse slope dwarfs any noise-induced slope on the ramp
        let signal = |t: f64| -> f64 {
            if t < 0.0 || t > 8.4 {
                0.0
            } else if t <= 8.0 {
                t / 8.0
            } else {
                1.0 - (t - 8.0) / 0.4
            }
        };

        let nx = 21;
        let x = Array1::linspace(-20.0, 20.0, nx);
        let times = Array1::linspace(0.0, 10.0, 11);
        let density =
            Array2::from_shape_fn((nx, 11), |(_, j)| signal(times[j]) * 1e6).into_dyn();
        let da = LabeledArray::new(
            density,
            vec![AxisCoord::new("x", x), plateau_axis(&times)],
        )
        .unwrap();

        let trace_times = Array1::linspace(0.0, 13.0, 261);
        let trace = InterferometryTrace {
            values: trace_times.mapv(|t| 40.0 * signal(t - 2.0) + noise.sample(&mut rng)),
            times_ms: trace_times,
        };
        let config = CalibrationConfig {
            core_radius_cm: 26.0,
            steady_state: PlateauRange::new(4, 8),
        };
        let cal = calibrate_with_trace(&da, &trace, &config).unwrap();
        let (_, factor) = &cal.scale[0];
        // Mid-discharge samples (the steady-state window) stay near unity
        for j in 3..=7 {
            let f = factor.values[[j]];
            assert!(f > 0.0, "noisy factor must stay positive, got {f}");
            assert!((0.7..=1.3).contains(&f), "noisy factor {f} out of range");
        }
    }

    #[test]
    fn test_two_dimensional_field_proceeds_with_both_factors() {
        let times = Array1::linspace(0.0, 10.0, 11);
        let x = Array1::linspace(-10.0, 10.0, 3);
        let y = Array1::linspace(-10.0, 10.0, 3);
        let values = Array3::from_shape_fn((3, 3, 11), |(_, _, k)| {
            (discharge(times[k]) + 0.1) * 1e6
        })
        .into_dyn();
        let da = LabeledArray::new(
            values,
            vec![
                AxisCoord::new("x", x),
                AxisCoord::new("y", y),
                plateau_axis(&times),
            ],
        )
        .unwrap();
        let trace_times = Array1::linspace(0.0, 12.0, 241);
        let trace = InterferometryTrace {
            values: trace_times.mapv(|t| 20.0 * (discharge(t - 1.0) + 0.1)),
            times_ms: trace_times,
        };
        let config = CalibrationConfig {
            core_radius_cm: 26.0,
            steady_state: PlateauRange::new(1, 11),
        };
        let cal = calibrate_with_trace(&da, &trace, &config).unwrap();
        assert!(cal.has_x && cal.has_y);
        assert_eq!(cal.scale.len(), 2);
        assert_eq!(cal.scale[0].0, "x");
        assert_eq!(cal.scale[1].0, "y");
    }

    #[test]
    fn test_degenerate_spatial_axes_rejected() {
        let times = Array1::linspace(0.0, 5.0, 6);
        let da = LabeledArray::new(
            Array2::from_elem((1, 6), 1.0).into_dyn(),
            vec![AxisCoord::new("x", array![0.0]), plateau_axis(&times)],
        )
        .unwrap();
        let trace = InterferometryTrace {
            values: Array1::from_elem(6, 1.0),
            times_ms: times,
        };
        let config = CalibrationConfig {
            core_radius_cm: 26.0,
            steady_state: PlateauRange::new(1, 6),
        };
        assert!(calibrate_with_trace(&da, &trace, &config).is_err());
    }

    #[test]
    fn test_missing_time_axis_fails_fast() {
        let da = LabeledArray::from_1d(
            AxisCoord::new("x", array![0.0, 1.0]),
            array![1.0, 2.0],
        )
        .unwrap();
        let trace = InterferometryTrace {
            values: array![1.0, 1.0],
            times_ms: array![0.0, 1.0],
        };
        let config = CalibrationConfig {
            core_radius_cm: 26.0,
            steady_state: PlateauRange::new(1, 2),
        };
        assert!(calibrate_with_trace(&da, &trace, &config).is_err());
    }

    #[test]
    fn test_zero_line_integral_yields_nan_factor() {
        // Zero density everywhere → zero line integral → NaN factor, no error
        let times = Array1::linspace(0.0, 4.0, 5);
        let x = Array1::linspace(-10.0, 10.0, 5);
        let da = LabeledArray::new(
            Array2::zeros((5, 5)).into_dyn(),
            vec![AxisCoord::new("x", x), plateau_axis(&times)],
        )
        .unwrap();
        let trace = InterferometryTrace {
            values: Array1::from_elem(5, 3.0),
            times_ms: times,
        };
        let config = CalibrationConfig {
            core_radius_cm: 26.0,
            steady_state: PlateauRange::new(1, 5),
        };
        let cal = calibrate_with_trace(&da, &trace, &config).unwrap();
        let (_, factor) = &cal.scale[0];
        assert!(factor.values.iter().all(|v| v.is_nan()));
    }
}
