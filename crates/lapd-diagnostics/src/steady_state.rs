//! Steady-state and core-region reduction helpers.

use lapd_types::array::{ArrayMeta, LabeledArray};
use lapd_types::config::PlateauRange;
use lapd_types::error::{AnalysisError, AnalysisResult};

/// NaN-mask every sample whose plateau index lies outside the inclusive
/// steady-state window.
pub fn steady_state_only(
    da: &LabeledArray,
    range: PlateauRange,
) -> AnalysisResult<LabeledArray> {
    da.mask_axis_aux("time", "plateau", |p| range.contains(p))
}

/// Whether a position (cm) lies inside the core disk.
pub fn in_core(position_cm: f64, core_radius_cm: f64) -> bool {
    position_cm.abs() < core_radius_cm
}

/// Drop every x and y coordinate outside the core disk.
pub fn core_only(da: &LabeledArray, core_radius_cm: f64) -> AnalysisResult<LabeledArray> {
    let mut out = da.clone();
    for axis in ["x", "y"] {
        if out.has_axis(axis) {
            out = out.select_axis(axis, |c| in_core(c, core_radius_cm))?;
        }
    }
    Ok(out)
}

/// Mean of a diagnostic restricted to the core disk and the steady-state
/// window, reduced over every axis not listed in `dims_to_keep`.
pub fn core_steady_state_mean(
    da: &LabeledArray,
    core_radius_cm: Option<f64>,
    steady_state: Option<PlateauRange>,
    dims_to_keep: &[&str],
) -> AnalysisResult<LabeledArray> {
    let mut out = da.clone();
    if let Some(radius) = core_radius_cm {
        out = core_only(&out, radius)?;
    }
    if let Some(range) = steady_state {
        out = steady_state_only(&out, range)?;
    }
    out.mean_all_except(dims_to_keep)
}

/// Linear combination of co-indexed sweep signals along the `isweep` axis.
/// `[1, 0]` selects the first signal, `[1, -1]` the parallel difference.
pub fn isweep_select(da: &LabeledArray, weights: &[f64]) -> AnalysisResult<LabeledArray> {
    let n = da.size_of("isweep");
    if n == 0 {
        return Err(AnalysisError::MissingAxis {
            axis: "isweep".to_string(),
            context: "sweep-signal selection".to_string(),
        });
    }
    if weights.len() != n {
        return Err(AnalysisError::ShapeMismatch(format!(
            "{} weights for {} sweep signals",
            weights.len(),
            n
        )));
    }
    let mut combined: Option<LabeledArray> = None;
    for (k, &w) in weights.iter().enumerate() {
        let term = da.isel("isweep", k)?.map(|v| v * w);
        combined = Some(match combined {
            None => term,
            Some(acc) => acc.zip_same(&term, |a, b| a + b)?,
        });
    }
    let mut out = combined.ok_or_else(|| {
        AnalysisError::ConfigError("empty sweep-signal weight vector".to_string())
    })?;
    let mut tag = ArrayMeta::default();
    tag.tags
        .insert("facevector".to_string(), format!("{weights:?}"));
    out.meta = out.meta.merged_with(&tag);
    Ok(out)
}
