//! Trapezoidal integration against axis coordinates.

use lapd_types::array::LabeledArray;
use lapd_types::error::{AnalysisError, AnalysisResult};
use ndarray::{Array1, ArrayD, Axis, IxDyn, Zip};

/// Trapezoidal rule over one coordinate vector. NaN samples make the whole
/// integral NaN (missing segments are not skipped).
pub fn trapz(values: &Array1<f64>, coords: &Array1<f64>) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for k in 0..n - 1 {
        total += 0.5 * (values[k] + values[k + 1]) * (coords[k + 1] - coords[k]);
    }
    total
}

/// Trapezoidal line integral of a labeled array along `axis`, against that
/// axis's coordinate values. The axis is removed from the result; its name is
/// recorded in the metadata provenance.
pub fn trapezoid(da: &LabeledArray, axis: &str) -> AnalysisResult<LabeledArray> {
    let i = da
        .axis_index(axis)
        .ok_or_else(|| AnalysisError::MissingAxis {
            axis: axis.to_string(),
            context: "integrand".to_string(),
        })?;
    let coords = &da.axes[i].values;
    let n = coords.len();
    if n == 0 {
        return Err(AnalysisError::ShapeMismatch(format!(
            "cannot integrate over empty axis '{axis}'"
        )));
    }

    let mut shape: Vec<usize> = da.values.shape().to_vec();
    shape.remove(i);
    let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
    for k in 0..n.saturating_sub(1) {
        let a = da.values.index_axis(Axis(i), k);
        let b = da.values.index_axis(Axis(i), k + 1);
        let dx = coords[k + 1] - coords[k];
        Zip::from(&mut out)
            .and(&a)
            .and(&b)
            .for_each(|o, &lo, &hi| *o += 0.5 * (lo + hi) * dx);
    }

    let mut axes = da.axes.clone();
    axes.remove(i);
    let mut result = LabeledArray::new(out, axes)?;
    result.meta = da.meta.clone();
    result.meta.units = None;
    result.meta.provenance = Some(match &da.meta.provenance {
        Some(p) => format!("{p}; integrated over {axis}"),
        None => format!("integrated over {axis}"),
    });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapd_types::array::AxisCoord;
    use ndarray::array;

    #[test]
    fn test_trapz_constant() {
        let values = array![2.0, 2.0, 2.0];
        let coords = array![0.0, 1.0, 3.0];
        assert!((trapz(&values, &coords) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_trapz_linear_exact() {
        // f(x) = x over [0, 4] → 8, exact for the trapezoidal rule
        let coords = Array1::linspace(0.0, 4.0, 9);
        let values = coords.clone();
        assert!((trapz(&values, &coords) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_trapz_nan_propagates() {
        let values = array![1.0, f64::NAN, 1.0];
        let coords = array![0.0, 1.0, 2.0];
        assert!(trapz(&values, &coords).is_nan());
    }

    #[test]
    fn test_trapezoid_removes_axis() {
        // density(x, t) = 1 + t, independent of x over [-10, 10]
        let values =
            ndarray::Array2::from_shape_fn((5, 3), |(_, j)| 1.0 + j as f64).into_dyn();
        let da = LabeledArray::new(
            values,
            vec![
                AxisCoord::new("x", Array1::linspace(-10.0, 10.0, 5)),
                AxisCoord::new("time", array![0.0, 1.0, 2.0]),
            ],
        )
        .unwrap();
        let integral = trapezoid(&da, "x").unwrap();
        assert_eq!(integral.values.shape(), &[3]);
        for j in 0..3 {
            let expected = 20.0 * (1.0 + j as f64);
            assert!(
                (integral.values[[j]] - expected).abs() < 1e-10,
                "integral at t={j} was {}",
                integral.values[[j]]
            );
        }
        assert!(!integral.has_axis("x"));
    }

    #[test]
    fn test_trapezoid_irregular_spacing() {
        let values = array![[1.0, 1.0], [3.0, 3.0], [5.0, 5.0]].into_dyn();
        let da = LabeledArray::new(
            values,
            vec![
                AxisCoord::new("x", array![0.0, 1.0, 4.0]),
                AxisCoord::new("time", array![0.0, 1.0]),
            ],
        )
        .unwrap();
        let integral = trapezoid(&da, "x").unwrap();
        // 0.5*(1+3)*1 + 0.5*(3+5)*3 = 2 + 12
        assert!((integral.values[[0]] - 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_trapezoid_degenerate_axis() {
        let da = LabeledArray::new(
            array![[7.0, 8.0]].into_dyn(),
            vec![
                AxisCoord::new("x", array![0.0]),
                AxisCoord::new("time", array![0.0, 1.0]),
            ],
        )
        .unwrap();
        let integral = trapezoid(&da, "x").unwrap();
        assert!((integral.values[[0]]).abs() < 1e-12);
        assert!((integral.values[[1]]).abs() < 1e-12);
    }

    #[test]
    fn test_trapezoid_missing_axis() {
        let da = LabeledArray::from_1d(
            AxisCoord::new("time", array![0.0, 1.0]),
            array![1.0, 2.0],
        )
        .unwrap();
        assert!(trapezoid(&da, "x").is_err());
    }
}
