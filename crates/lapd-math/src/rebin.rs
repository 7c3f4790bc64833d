//! Bucket re-binning onto a target coordinate grid.
//!
//! One series sampled on its own clock is "crunched" onto another's grid by
//! averaging every source sample falling within half a target step of each
//! target coordinate. Empty buckets are NaN, never an error. The per-bucket
//! map is embarrassingly parallel.

use lapd_types::array::{AxisCoord, LabeledArray};
use lapd_types::error::{AnalysisError, AnalysisResult};
use ndarray::{Array1, ArrayD, Axis, IxDyn, Zip};
use rayon::prelude::*;

/// Mean step of a coordinate vector: total span over sample count.
pub fn mean_step(coords: &Array1<f64>) -> f64 {
    let n = coords.len();
    if n == 0 {
        return 0.0;
    }
    (coords[n - 1] - coords[0]) / n as f64
}

/// Average all source samples whose coordinate lies strictly within
/// `half_width` of each target coordinate. NaN source values are skipped;
/// a bucket with no samples yields NaN.
pub fn bucket_mean(
    src_coords: &Array1<f64>,
    src_values: &Array1<f64>,
    targets: &Array1<f64>,
    half_width: f64,
) -> Array1<f64> {
    let targets: Vec<f64> = targets.iter().copied().collect();
    let out: Vec<f64> = targets
        .par_iter()
        .map(|&t| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (&s, &v) in src_coords.iter().zip(src_values.iter()) {
                if s > t - half_width && s < t + half_width && !v.is_nan() {
                    sum += v;
                    count += 1;
                }
            }
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect();
    Array1::from_vec(out)
}

/// Re-bin a labeled array along `axis` onto `target` coordinates, averaging
/// every source slice whose coordinate falls strictly within `half_width` of
/// each target coordinate. The axis (with its auxiliary coordinates) is
/// replaced by `target`.
pub fn rebin_axis(
    da: &LabeledArray,
    axis: &str,
    target: &AxisCoord,
    half_width: f64,
) -> AnalysisResult<LabeledArray> {
    let i = da
        .axis_index(axis)
        .ok_or_else(|| AnalysisError::MissingAxis {
            axis: axis.to_string(),
            context: "re-binning input".to_string(),
        })?;
    let src = &da.axes[i].values;
    let groups: Vec<Vec<usize>> = target
        .values
        .iter()
        .map(|&t| {
            src.iter()
                .enumerate()
                .filter(|(_, &s)| s > t - half_width && s < t + half_width)
                .map(|(k, _)| k)
                .collect()
        })
        .collect();

    let mut lane_shape: Vec<usize> = da.values.shape().to_vec();
    lane_shape.remove(i);
    let slabs: Vec<ArrayD<f64>> = groups
        .par_iter()
        .map(|group| {
            let mut sum = ArrayD::<f64>::zeros(IxDyn(&lane_shape));
            let mut count = ArrayD::<f64>::zeros(IxDyn(&lane_shape));
            for &s in group {
                let sub = da.values.index_axis(Axis(i), s);
                Zip::from(&mut sum)
                    .and(&mut count)
                    .and(&sub)
                    .for_each(|acc, c, &v| {
                        if !v.is_nan() {
                            *acc += v;
                            *c += 1.0;
                        }
                    });
            }
            Zip::from(&mut sum).and(&count).for_each(|acc, &c| {
                *acc = if c > 0.0 { *acc / c } else { f64::NAN };
            });
            sum
        })
        .collect();

    let mut shape: Vec<usize> = da.values.shape().to_vec();
    shape[i] = target.len();
    let mut out = ArrayD::<f64>::from_elem(IxDyn(&shape), f64::NAN);
    for (k, slab) in slabs.iter().enumerate() {
        out.index_axis_mut(Axis(i), k).assign(slab);
    }
    let mut axes = da.axes.clone();
    axes[i] = target.clone();
    let mut result = LabeledArray::new(out, axes)?;
    result.meta = da.meta.clone();
    Ok(result)
}

/// Index of the coordinate nearest to `value`, if within `tolerance`.
pub fn nearest_index(coords: &Array1<f64>, value: f64, tolerance: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (k, &c) in coords.iter().enumerate() {
        let d = (c - value).abs();
        if d <= tolerance && best.map(|(_, bd)| d < bd).unwrap_or(true) {
            best = Some((k, d));
        }
    }
    best.map(|(k, _)| k)
}
