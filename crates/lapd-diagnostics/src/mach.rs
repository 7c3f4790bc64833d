//! Mach numbers and flow velocities from multi-face saturation currents.
//!
//! The Mach probe is a regular octagon: faces 2/5 are the field-aligned
//! upstream/downstream pair, faces 3/6 and 1/4 are the fore and aft diagonal
//! pairs, offset ±45° from the flow axis. That geometry is baked into the
//! fixed angle constant below and is not configurable per probe. The
//! magnetized-probe model behind it is valid for face-alignment angles
//! strictly between 30° and 150° from perpendicular; this is not enforced
//! here.

use lapd_math::rebin::{mean_step, nearest_index, rebin_axis};
use lapd_types::array::LabeledArray;
use lapd_types::constants::Q_ELECTRON;
use lapd_types::error::{AnalysisError, AnalysisResult};
use lapd_types::species::IonSpecies;
use lapd_types::units::Unit;
use log::info;
use ndarray::{ArrayD, Axis, IxDyn};
use std::f64::consts::FRAC_PI_4;

/// Magnetization factor from Hutchinson's derivation incorporating
/// diamagnetic drift.
pub const MAGNETIZATION_FACTOR: f64 = 0.5;

/// Angle the fore-direction face pair makes with the field (rad).
const ANGLE_FORE: f64 = FRAC_PI_4;

/// Angle the aft-direction face pair makes with the field (rad).
const ANGLE_AFT: f64 = FRAC_PI_4;

/// Ion adiabatic index in the sound-speed model.
const ION_ADIABATIC_INDEX: f64 = 3.0;

/// Assumed LAPD ion temperature (eV).
const ION_TEMPERATURE_EV: f64 = 1.0;

/// Largest probe-to-probe port distance still considered the same location.
const PORT_MATCH_TOLERANCE: f64 = 3.0;

/// Perpendicular Mach number and its two directional estimates.
#[derive(Debug, Clone)]
pub struct PerpendicularMach {
    pub mean: LabeledArray,
    pub fore: LabeledArray,
    pub aft: LabeledArray,
}

/// Mach numbers at each position and time increment.
#[derive(Debug, Clone)]
pub struct MachNumbers {
    pub m_para: LabeledArray,
    /// Present only when faces 1, 3, 4 and 6 were all measured.
    pub perp: Option<PerpendicularMach>,
}

/// Flow velocities (m/s) on the electron-temperature grid.
#[derive(Debug, Clone)]
pub struct Velocities {
    pub v_para: LabeledArray,
    pub v_perp: Option<LabeledArray>,
}

/// Derive Mach numbers from an ion-saturation-current array indexed by
/// `face` (values 1–6). Faces 2 and 5 are required; the perpendicular
/// outputs are omitted, not an error, when any of faces 1, 3, 4, 6 is
/// absent. Non-positive current ratios propagate as NaN.
pub fn get_mach_numbers(isat: &LabeledArray) -> AnalysisResult<MachNumbers> {
    let face_coords = isat.axis("face")?.values.clone();
    info!("Calculating Mach numbers...");

    let i2 = select_face(isat, 2)?;
    let i5 = select_face(isat, 5)?;
    let m_para = i2.zip_same(&i5, |up, down| {
        MAGNETIZATION_FACTOR * (up / down).ln()
    })?;

    let has_face = |f: f64| face_coords.iter().any(|&c| (c - f).abs() < 1e-9);
    let perp = if [1.0, 3.0, 4.0, 6.0].iter().all(|&f| has_face(f)) {
        let corr_fore = select_face(isat, 3)?.zip_same(&select_face(isat, 6)?, |up, down| {
            MAGNETIZATION_FACTOR * (up / down).ln()
        })?;
        let corr_aft = select_face(isat, 1)?.zip_same(&select_face(isat, 4)?, |up, down| {
            MAGNETIZATION_FACTOR * (up / down).ln()
        })?;
        let fore = m_para.zip_same(&corr_fore, |m, c| (m - c) * ANGLE_FORE.cos())?;
        let aft = m_para.zip_same(&corr_aft, |m, c| (m - c) * ANGLE_AFT.cos())?;
        let mean = fore.zip_same(&aft, |a, b| 0.5 * (a + b))?;
        Some(PerpendicularMach { mean, fore, aft })
    } else {
        None
    };

    Ok(MachNumbers { m_para, perp })
}

fn select_face(isat: &LabeledArray, face: u32) -> AnalysisResult<LabeledArray> {
    isat.sel("face", face as f64)
        .map_err(|_| AnalysisError::MissingFace { face })
}

/// Local ion sound speed (m/s) from an electron-temperature field (eV),
/// with fixed adiabatic index and assumed ion temperature.
pub fn sound_speed(electron_temperature: &LabeledArray, ion: IonSpecies) -> LabeledArray {
    let m_ion = ion.mass_kg();
    electron_temperature
        .map(|te| (((te + ION_ADIABATIC_INDEX * ION_TEMPERATURE_EV) * Q_ELECTRON) / m_ion).sqrt())
        .with_units(Unit::MetersPerSecond)
}

/// Convert Mach numbers into flow velocities on the electron-temperature
/// grid. The Mach data is re-binned onto the temperature time axis and
/// re-indexed to the nearest matching port before multiplication by the
/// sound speed. `v_perp` is produced only when the perpendicular Mach
/// number was available upstream.
pub fn get_velocity(
    mach: &MachNumbers,
    electron_temperature: &LabeledArray,
    ion: IonSpecies,
) -> AnalysisResult<Velocities> {
    info!("Deriving flow velocities for {}", ion.symbol());
    let speed = sound_speed(electron_temperature, ion);

    let para = align_to_temperature(&mach.m_para, electron_temperature)?;
    let v_para = speed
        .broadcast_with(&para, |c, m| m * c)?
        .with_units(Unit::MetersPerSecond);

    let v_perp = match &mach.perp {
        Some(perp) => {
            let aligned = align_to_temperature(&perp.mean, electron_temperature)?;
            Some(
                speed
                    .broadcast_with(&aligned, |c, m| m * c)?
                    .with_units(Unit::MetersPerSecond),
            )
        }
        None => None,
    };

    Ok(Velocities { v_para, v_perp })
}

/// Crunch a Mach-number array onto the temperature time grid, then re-index
/// its probe axis to the temperature probes by nearest port position.
fn align_to_temperature(
    da: &LabeledArray,
    temperature: &LabeledArray,
) -> AnalysisResult<LabeledArray> {
    let te_time = temperature.axis("time")?;
    let dt = mean_step(&te_time.values);
    let crunched = rebin_axis(da, "time", te_time, dt / 2.0)?;
    reindex_ports(&crunched, temperature)
}

/// Re-index the `probe` axis of `da` onto the probes of `like`, matching by
/// the `port` auxiliary coordinate. Probes with no port match within
/// tolerance become NaN lanes.
fn reindex_ports(da: &LabeledArray, like: &LabeledArray) -> AnalysisResult<LabeledArray> {
    match (da.axis_index("probe"), like.axis_index("probe")) {
        (None, None) => Ok(da.clone()),
        (Some(i), Some(_)) => {
            let src_ports = da.axes[i].aux("port").ok_or_else(|| {
                AnalysisError::ConfigError(
                    "Mach probe axis carries no port coordinate".to_string(),
                )
            })?;
            let target_axis = like.axis("probe")?.clone();
            let target_ports = target_axis
                .aux("port")
                .ok_or_else(|| {
                    AnalysisError::ConfigError(
                        "temperature probe axis carries no port coordinate".to_string(),
                    )
                })?
                .clone();

            let mut shape: Vec<usize> = da.values.shape().to_vec();
            shape[i] = target_axis.len();
            let mut out = ArrayD::<f64>::from_elem(IxDyn(&shape), f64::NAN);
            for (k, &port) in target_ports.iter().enumerate() {
                if let Some(j) = nearest_index(src_ports, port, PORT_MATCH_TOLERANCE) {
                    out.index_axis_mut(Axis(i), k)
                        .assign(&da.values.index_axis(Axis(i), j));
                }
            }
            let mut axes = da.axes.clone();
            axes[i] = target_axis;
            let mut result = LabeledArray::new(out, axes)?;
            result.meta = da.meta.clone();
            Ok(result)
        }
        _ => Err(AnalysisError::MissingAxis {
            axis: "probe".to_string(),
            context: "port re-indexing (present on only one of Mach/temperature)".to_string(),
        }),
    }
}
