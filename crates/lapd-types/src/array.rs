// ─────────────────────────────────────────────────────────────────────
// LAPD Plasma Analysis — Labeled Arrays
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! N-dimensional arrays with named, coordinate-carrying axes.
//!
//! The universal currency between analysis components. Axes carry a primary
//! coordinate vector (`time` in ms, `x`/`y` in cm, integer-valued `face`,
//! `probe`, `shot`) and optional auxiliary per-sample coordinates (`plateau`
//! on `time`, `port` on `probe`). Missing data is `f64::NAN` and propagates
//! through arithmetic.

use crate::error::{AnalysisError, AnalysisResult};
use crate::units::Unit;
use ndarray::{Array1, ArrayD, Axis, IxDyn, Zip};
use std::collections::BTreeMap;

/// Coordinate tolerance for selecting by value (integer-valued axes).
const COORD_EQ_TOL: f64 = 1e-9;

/// Fixed-shape metadata attached to a labeled array.
/// Merge rule: later overwrites earlier, field by field.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArrayMeta {
    pub units: Option<Unit>,
    pub provenance: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl ArrayMeta {
    /// Merge `later` over `self`: set fields of `later` win, tags are
    /// key-merged with `later` taking precedence.
    pub fn merged_with(&self, later: &ArrayMeta) -> ArrayMeta {
        let mut tags = self.tags.clone();
        for (k, v) in &later.tags {
            tags.insert(k.clone(), v.clone());
        }
        ArrayMeta {
            units: later.units.or(self.units),
            provenance: later.provenance.clone().or_else(|| self.provenance.clone()),
            tags,
        }
    }
}

/// One named axis: primary coordinates plus auxiliary per-sample coordinates.
#[derive(Debug, Clone)]
pub struct AxisCoord {
    pub name: String,
    pub values: Array1<f64>,
    pub aux: Vec<(String, Array1<f64>)>,
}

impl AxisCoord {
    pub fn new(name: &str, values: Array1<f64>) -> Self {
        AxisCoord {
            name: name.to_string(),
            values,
            aux: Vec::new(),
        }
    }

    /// Attach an auxiliary coordinate (length checked at array construction).
    pub fn with_aux(mut self, name: &str, values: Array1<f64>) -> Self {
        self.aux.push((name.to_string(), values));
        self
    }

    pub fn aux(&self, name: &str) -> Option<&Array1<f64>> {
        self.aux
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Restrict the axis (primary and auxiliary coordinates) to `indices`.
    fn subset(&self, indices: &[usize]) -> AxisCoord {
        let pick = |v: &Array1<f64>| {
            Array1::from_iter(indices.iter().map(|&i| v[i]))
        };
        AxisCoord {
            name: self.name.clone(),
            values: pick(&self.values),
            aux: self
                .aux
                .iter()
                .map(|(n, v)| (n.clone(), pick(v)))
                .collect(),
        }
    }
}

/// N-dimensional f64 array with named axes and attached metadata.
#[derive(Debug, Clone)]
pub struct LabeledArray {
    pub values: ArrayD<f64>,
    pub axes: Vec<AxisCoord>,
    pub meta: ArrayMeta,
}

impl LabeledArray {
    /// Build from values and axes; every axis must match the array shape and
    /// every auxiliary coordinate must match its axis length.
    pub fn new(values: ArrayD<f64>, axes: Vec<AxisCoord>) -> AnalysisResult<Self> {
        if values.ndim() != axes.len() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "{} axes for {}-dimensional array",
                axes.len(),
                values.ndim()
            )));
        }
        for (dim, axis) in values.shape().iter().zip(&axes) {
            if axis.len() != *dim {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "axis '{}' has {} coordinates for dimension of length {}",
                    axis.name,
                    axis.len(),
                    dim
                )));
            }
            for (aux_name, aux_values) in &axis.aux {
                if aux_values.len() != *dim {
                    return Err(AnalysisError::ShapeMismatch(format!(
                        "auxiliary coordinate '{aux_name}' has {} values on axis '{}' of length {}",
                        aux_values.len(),
                        axis.name,
                        dim
                    )));
                }
            }
        }
        Ok(LabeledArray {
            values,
            axes,
            meta: ArrayMeta::default(),
        })
    }

    /// 1-D convenience constructor.
    pub fn from_1d(axis: AxisCoord, values: Array1<f64>) -> AnalysisResult<Self> {
        LabeledArray::new(values.into_dyn(), vec![axis])
    }

    pub fn with_meta(mut self, meta: ArrayMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_units(mut self, unit: Unit) -> Self {
        self.meta.units = Some(unit);
        self
    }

    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name == name)
    }

    pub fn has_axis(&self, name: &str) -> bool {
        self.axis_index(name).is_some()
    }

    /// Length of the named axis; 0 when absent.
    pub fn size_of(&self, name: &str) -> usize {
        self.axis_index(name)
            .map(|i| self.axes[i].len())
            .unwrap_or(0)
    }

    pub fn axis(&self, name: &str) -> AnalysisResult<&AxisCoord> {
        self.axis_index(name)
            .map(|i| &self.axes[i])
            .ok_or_else(|| AnalysisError::MissingAxis {
                axis: name.to_string(),
                context: self
                    .meta
                    .provenance
                    .clone()
                    .unwrap_or_else(|| "labeled array".to_string()),
            })
    }

    fn require_axis_index(&self, name: &str) -> AnalysisResult<usize> {
        self.axis_index(name)
            .ok_or_else(|| AnalysisError::MissingAxis {
                axis: name.to_string(),
                context: self
                    .meta
                    .provenance
                    .clone()
                    .unwrap_or_else(|| "labeled array".to_string()),
            })
    }

    /// Select the slice whose coordinate on `axis` equals `value`; the axis
    /// is removed from the result.
    pub fn sel(&self, axis: &str, value: f64) -> AnalysisResult<LabeledArray> {
        let i = self.require_axis_index(axis)?;
        let pos = self.axes[i]
            .values
            .iter()
            .position(|&c| (c - value).abs() < COORD_EQ_TOL)
            .ok_or_else(|| {
                AnalysisError::ConfigError(format!("no coordinate {value} on axis '{axis}'"))
            })?;
        self.isel_index(i, pos)
    }

    /// Select by position on a named axis; the axis is removed.
    pub fn isel(&self, axis: &str, index: usize) -> AnalysisResult<LabeledArray> {
        let i = self.require_axis_index(axis)?;
        self.isel_index(i, index)
    }

    fn isel_index(&self, i: usize, index: usize) -> AnalysisResult<LabeledArray> {
        if index >= self.axes[i].len() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "index {index} out of bounds on axis '{}' of length {}",
                self.axes[i].name,
                self.axes[i].len()
            )));
        }
        let values = self.values.index_axis(Axis(i), index).to_owned();
        let mut axes = self.axes.clone();
        axes.remove(i);
        Ok(LabeledArray {
            values,
            axes,
            meta: self.meta.clone(),
        })
    }

    /// Keep only coordinates on `axis` passing `pred` (drops the rest).
    pub fn select_axis(
        &self,
        axis: &str,
        pred: impl Fn(f64) -> bool,
    ) -> AnalysisResult<LabeledArray> {
        let i = self.require_axis_index(axis)?;
        let indices: Vec<usize> = self.axes[i]
            .values
            .iter()
            .enumerate()
            .filter(|(_, &c)| pred(c))
            .map(|(k, _)| k)
            .collect();
        let values = self.values.select(Axis(i), &indices);
        let mut axes = self.axes.clone();
        axes[i] = self.axes[i].subset(&indices);
        Ok(LabeledArray {
            values,
            axes,
            meta: self.meta.clone(),
        })
    }

    /// NaN-mask every slice whose primary coordinate on `axis` fails `pred`.
    pub fn mask_axis(
        &self,
        axis: &str,
        pred: impl Fn(f64) -> bool,
    ) -> AnalysisResult<LabeledArray> {
        let i = self.require_axis_index(axis)?;
        let coords = self.axes[i].values.clone();
        self.mask_axis_by(i, &coords, pred)
    }

    /// NaN-mask every slice whose auxiliary coordinate `aux` on `axis` fails
    /// `pred`.
    pub fn mask_axis_aux(
        &self,
        axis: &str,
        aux: &str,
        pred: impl Fn(f64) -> bool,
    ) -> AnalysisResult<LabeledArray> {
        let i = self.require_axis_index(axis)?;
        let coords = self.axes[i]
            .aux(aux)
            .ok_or_else(|| {
                AnalysisError::ConfigError(format!(
                    "axis '{axis}' carries no auxiliary coordinate '{aux}'"
                ))
            })?
            .clone();
        self.mask_axis_by(i, &coords, pred)
    }

    fn mask_axis_by(
        &self,
        i: usize,
        coords: &Array1<f64>,
        pred: impl Fn(f64) -> bool,
    ) -> AnalysisResult<LabeledArray> {
        let mut values = self.values.clone();
        for (k, &c) in coords.iter().enumerate() {
            if !pred(c) {
                values.index_axis_mut(Axis(i), k).fill(f64::NAN);
            }
        }
        Ok(LabeledArray {
            values,
            axes: self.axes.clone(),
            meta: self.meta.clone(),
        })
    }

    /// Elementwise map, preserving axes and metadata.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> LabeledArray {
        LabeledArray {
            values: self.values.mapv(|v| f(v)),
            axes: self.axes.clone(),
            meta: self.meta.clone(),
        }
    }

    /// Elementwise combination of two arrays on identical grids.
    pub fn zip_same(
        &self,
        other: &LabeledArray,
        f: impl Fn(f64, f64) -> f64,
    ) -> AnalysisResult<LabeledArray> {
        if other.axes.len() != self.axes.len() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "{} axes combined with {} axes",
                self.axes.len(),
                other.axes.len()
            )));
        }
        for (a, b) in self.axes.iter().zip(&other.axes) {
            if a.name != b.name {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "axis '{}' combined with axis '{}'",
                    a.name, b.name
                )));
            }
        }
        self.check_axes_aligned(other, &(0..self.axes.len()).collect::<Vec<_>>())?;
        let mut values = self.values.clone();
        Zip::from(&mut values)
            .and(&other.values)
            .for_each(|a, &b| *a = f(*a, b));
        Ok(LabeledArray {
            values,
            axes: self.axes.clone(),
            meta: self.meta.clone(),
        })
    }

    /// Elementwise combination where `other`'s axes are a subset of `self`'s;
    /// `other` is broadcast along the remaining axes by name.
    pub fn broadcast_with(
        &self,
        other: &LabeledArray,
        f: impl Fn(f64, f64) -> f64,
    ) -> AnalysisResult<LabeledArray> {
        let mut axis_map = Vec::with_capacity(other.axes.len());
        for axis in &other.axes {
            axis_map.push(self.require_axis_index(&axis.name)?);
        }
        self.check_axes_aligned(other, &axis_map)?;
        let mut values = self.values.clone();
        let mut oidx = vec![0usize; other.axes.len()];
        for (idx, v) in values.indexed_iter_mut() {
            for (k, &i) in axis_map.iter().enumerate() {
                oidx[k] = idx[i];
            }
            *v = f(*v, other.values[IxDyn(&oidx)]);
        }
        Ok(LabeledArray {
            values,
            axes: self.axes.clone(),
            meta: self.meta.clone(),
        })
    }

    /// Shared axes must agree in length and coordinate values.
    fn check_axes_aligned(&self, other: &LabeledArray, axis_map: &[usize]) -> AnalysisResult<()> {
        for (other_axis, &i) in other.axes.iter().zip(axis_map) {
            let own = &self.axes[i];
            if own.len() != other_axis.len() {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "axis '{}' has lengths {} and {}",
                    own.name,
                    own.len(),
                    other_axis.len()
                )));
            }
            let misaligned = own
                .values
                .iter()
                .zip(other_axis.values.iter())
                .any(|(&a, &b)| (a - b).abs() > COORD_EQ_TOL && !(a.is_nan() && b.is_nan()));
            if misaligned {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "coordinates differ on shared axis '{}'",
                    own.name
                )));
            }
        }
        Ok(())
    }

    /// NaN-aware mean over the named axes (in order given).
    pub fn mean_over(&self, axes: &[&str]) -> AnalysisResult<LabeledArray> {
        let mut current = self.clone();
        for name in axes {
            let i = current.require_axis_index(name)?;
            let values = nanmean_reduce(&current.values, i);
            let mut reduced_axes = current.axes.clone();
            reduced_axes.remove(i);
            current = LabeledArray {
                values,
                axes: reduced_axes,
                meta: current.meta.clone(),
            };
        }
        Ok(current)
    }

    /// NaN-aware mean over every axis not named in `keep`.
    pub fn mean_all_except(&self, keep: &[&str]) -> AnalysisResult<LabeledArray> {
        let reduce: Vec<String> = self
            .axes
            .iter()
            .filter(|a| !keep.contains(&a.name.as_str()))
            .map(|a| a.name.clone())
            .collect();
        let reduce_refs: Vec<&str> = reduce.iter().map(|s| s.as_str()).collect();
        self.mean_over(&reduce_refs)
    }

    /// NaN-aware mean of every element; NaN when all elements are missing.
    pub fn nanmean_all(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &v in self.values.iter() {
            if !v.is_nan() {
                sum += v;
                count += 1;
            }
        }
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }
}

/// NaN-aware mean along one axis of a dynamic array.
fn nanmean_reduce(values: &ArrayD<f64>, axis: usize) -> ArrayD<f64> {
    let n = values.len_of(Axis(axis));
    let mut shape: Vec<usize> = values.shape().to_vec();
    shape.remove(axis);
    let mut sum = ArrayD::<f64>::zeros(IxDyn(&shape));
    let mut count = ArrayD::<f64>::zeros(IxDyn(&shape));
    for k in 0..n {
        let sub = values.index_axis(Axis(axis), k);
        Zip::from(&mut sum)
            .and(&mut count)
            .and(&sub)
            .for_each(|s, c, &v| {
                if !v.is_nan() {
                    *s += v;
                    *c += 1.0;
                }
            });
    }
    Zip::from(&mut sum).and(&count).for_each(|s, &c| {
        *s = if c > 0.0 { *s / c } else { f64::NAN };
    });
    sum
}
