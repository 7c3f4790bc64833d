//! On-disk dataset store.
//!
//! Labeled arrays persist as `.npz` archives: one `values` block, one block
//! per axis coordinate vector, one per auxiliary coordinate, and a JSON
//! `meta` block. Loading returns an explicit variant so the caller decides
//! whether to recompute; nothing falls back silently.

use lapd_types::array::{ArrayMeta, AxisCoord, LabeledArray};
use lapd_types::error::{AnalysisError, AnalysisResult};
use ndarray::{Array1, ArrayD};
use ndarray_npy::{NpzReader, NpzWriter};
use std::fs::File;
use std::io;
use std::path::Path;

/// Outcome of a dataset load.
#[derive(Debug)]
pub enum DatasetLoad {
    Loaded(LabeledArray),
    NotFound,
    Invalid(String),
}

/// Write a labeled array to a `.npz` archive at `path`.
pub fn save_dataset(path: &Path, da: &LabeledArray) -> AnalysisResult<()> {
    let file = File::create(path)?;
    let mut npz = NpzWriter::new(file);
    npz.add_array("values", &da.values)
        .map_err(|e| AnalysisError::Archive(e.to_string()))?;
    for (i, axis) in da.axes.iter().enumerate() {
        npz.add_array(format!("axis{i}:{}", axis.name), &axis.values)
            .map_err(|e| AnalysisError::Archive(e.to_string()))?;
        for (aux_name, aux_values) in &axis.aux {
            npz.add_array(format!("axis{i}:{}:aux:{aux_name}", axis.name), aux_values)
                .map_err(|e| AnalysisError::Archive(e.to_string()))?;
        }
    }
    let meta_bytes = serde_json::to_vec(&da.meta)?;
    npz.add_array("meta", &Array1::from_vec(meta_bytes))
        .map_err(|e| AnalysisError::Archive(e.to_string()))?;
    npz.finish()
        .map_err(|e| AnalysisError::Archive(e.to_string()))?;
    Ok(())
}

/// Load a labeled array from `path`. A missing file is `NotFound`; any
/// malformed archive is `Invalid` with the reason.
pub fn load_dataset(path: &Path) -> DatasetLoad {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return DatasetLoad::NotFound,
        Err(e) => return DatasetLoad::Invalid(e.to_string()),
    };
    match read_archive(file) {
        Ok(da) => DatasetLoad::Loaded(da),
        Err(e) => DatasetLoad::Invalid(e.to_string()),
    }
}

fn read_archive(file: File) -> AnalysisResult<LabeledArray> {
    let mut npz =
        NpzReader::new(file).map_err(|e| AnalysisError::Archive(e.to_string()))?;
    let names: Vec<String> = npz
        .names()
        .map_err(|e| AnalysisError::Archive(e.to_string()))?
        .into_iter()
        .map(|n| n.strip_suffix(".npy").unwrap_or(&n).to_string())
        .collect();

    let values: ArrayD<f64> = npz
        .by_name("values")
        .map_err(|e| AnalysisError::Archive(format!("no 'values' block: {e}")))?;

    // Axis entries: "axis{i}:{name}", auxiliary: "axis{i}:{name}:aux:{aux}"
    let mut axes: Vec<Option<AxisCoord>> = vec![None; values.ndim()];
    for name in &names {
        let Some((index, axis_name)) = parse_axis_entry(name) else {
            continue;
        };
        if axis_name.contains(":aux:") {
            continue;
        }
        if index >= axes.len() {
            return Err(AnalysisError::Archive(format!(
                "axis entry '{name}' out of range for {}-dimensional values",
                axes.len()
            )));
        }
        let coords: Array1<f64> = npz
            .by_name(name)
            .map_err(|e| AnalysisError::Archive(format!("bad axis block '{name}': {e}")))?;
        let mut axis = AxisCoord::new(&axis_name, coords);
        let aux_prefix = format!("axis{index}:{axis_name}:aux:");
        for aux_entry in names.iter().filter(|n| n.starts_with(&aux_prefix)) {
            let aux_name = &aux_entry[aux_prefix.len()..];
            let aux_values: Array1<f64> = npz.by_name(aux_entry).map_err(|e| {
                AnalysisError::Archive(format!("bad auxiliary block '{aux_entry}': {e}"))
            })?;
            axis = axis.with_aux(aux_name, aux_values);
        }
        axes[index] = Some(axis);
    }
    let axes: Vec<AxisCoord> = axes
        .into_iter()
        .enumerate()
        .map(|(i, a)| {
            a.ok_or_else(|| AnalysisError::Archive(format!("no coordinate block for axis {i}")))
        })
        .collect::<AnalysisResult<_>>()?;

    let meta = if names.iter().any(|n| n == "meta") {
        let bytes: Array1<u8> = npz
            .by_name("meta")
            .map_err(|e| AnalysisError::Archive(format!("bad meta block: {e}")))?;
        serde_json::from_slice::<ArrayMeta>(&bytes.to_vec())?
    } else {
        ArrayMeta::default()
    };

    Ok(LabeledArray::new(values, axes)?.with_meta(meta))
}

/// Split an `axis{i}:{rest}` entry name into its index and remainder.
fn parse_axis_entry(name: &str) -> Option<(usize, String)> {
    let rest = name.strip_prefix("axis")?;
    let colon = rest.find(':')?;
    let index: usize = rest[..colon].parse().ok()?;
    Some((index, rest[colon + 1..].to_string()))
}
