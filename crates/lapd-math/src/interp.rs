//! Gap interpolation and numerical differentiation along coordinates.

use lapd_types::array::LabeledArray;
use lapd_types::error::{AnalysisError, AnalysisResult};
use ndarray::{Array1, ArrayViewMut1, Axis};

/// First derivative of a sampled series against its coordinates.
/// Central differences inside, one-sided at the ends.
pub fn gradient_1d(values: &Array1<f64>, coords: &Array1<f64>) -> Array1<f64> {
    let n = values.len();
    let mut out = Array1::zeros(n);
    if n < 2 {
        return out;
    }
    out[0] = (values[1] - values[0]) / (coords[1] - coords[0]);
    out[n - 1] = (values[n - 1] - values[n - 2]) / (coords[n - 1] - coords[n - 2]);
    for k in 1..n - 1 {
        out[k] = (values[k + 1] - values[k - 1]) / (coords[k + 1] - coords[k - 1]);
    }
    out
}

/// Fill interior NaN runs along `axis` by linear interpolation in that axis's
/// coordinate, but only when the coordinate span between the bracketing valid
/// samples is at most `max_gap`. Leading and trailing runs are never filled
/// (no extrapolation), and wider runs stay NaN.
pub fn fill_gaps_linear(
    da: &LabeledArray,
    axis: &str,
    max_gap: f64,
) -> AnalysisResult<LabeledArray> {
    let i = da
        .axis_index(axis)
        .ok_or_else(|| AnalysisError::MissingAxis {
            axis: axis.to_string(),
            context: "gap interpolation input".to_string(),
        })?;
    let coords = da.axes[i].values.clone();
    let mut out = da.clone();
    for mut lane in out.values.lanes_mut(Axis(i)) {
        fill_lane(&mut lane, &coords, max_gap);
    }
    Ok(out)
}

fn fill_lane(lane: &mut ArrayViewMut1<f64>, coords: &Array1<f64>, max_gap: f64) {
    let n = lane.len();
    let mut k = 0;
    while k < n {
        if !lane[k].is_nan() {
            k += 1;
            continue;
        }
        let start = k;
        let mut end = k;
        while end < n && lane[end].is_nan() {
            end += 1;
        }
        if start > 0 && end < n {
            let x0 = coords[start - 1];
            let x1 = coords[end];
            if (x1 - x0).abs() <= max_gap {
                let v0 = lane[start - 1];
                let v1 = lane[end];
                for m in start..end {
                    let t = (coords[m] - x0) / (x1 - x0);
                    lane[m] = v0 + t * (v1 - v0);
                }
            }
        }
        k = end;
    }
}
