//! Conversion between tabular and gridded data

use crate::base::DataContainer;
use crate::datadict::DataDict;
use crate::errors::{DataDictError, Result};
use crate::meshgrid::MeshgridDataDict;
use crate::num::{array1d_to_meshgrid, guess_grid_from_sweep_direction};
use indexmap::IndexMap;
use ndarray::{Array1, ArrayD};

fn unique_valid_count(values: &ArrayD<f64>) -> usize {
    let mut valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    valid.sort_by(f64::total_cmp);
    valid.dedup();
    valid.len()
}

/// Guess the shape of each dependent from the unique values of its axes.
pub fn guess_shape_from_datadict(data: &DataDict) -> Result<IndexMap<String, Vec<usize>>> {
    let mut shapes = IndexMap::new();
    for dep in data.dependents() {
        let field = data.field(&dep)?;
        let mut shape = Vec::with_capacity(field.axes.len());
        for ax in &field.axes {
            shape.push(unique_valid_count(data.data_vals(ax)?));
        }
        shapes.insert(dep, shape);
    }
    Ok(shapes)
}

/// Shape in declared axis order, from unique values; all dependents must agree
fn unique_value_shape(data: &DataDict) -> Result<Vec<usize>> {
    let shapes = guess_shape_from_datadict(data)?;
    let mut iter = shapes.values();
    let first = iter.next().cloned().unwrap_or_default();
    if iter.any(|s| *s != first) {
        return Err(DataDictError::GridInference {
            message: "Cannot determine unique shape for all data.".to_string(),
        });
    }
    Ok(first)
}

/// Whether no axis has more unique values than its grid dimension holds
fn fits_unique_values(data: &DataDict, order: &[String], shape: &[usize]) -> Result<bool> {
    for (ax, &len) in order.iter().zip(shape) {
        if unique_valid_count(data.data_vals(ax)?) > len {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Make a meshgrid from tabular data.
///
/// Without `target_shape` the grid is inferred from the sweep pattern of the
/// axes, falling back to the number of unique values per axis. The values
/// are assumed to be stored in sweep order; `inner_axis_order` (slowest
/// to fastest) names that order when it differs from the declared axes order,
/// in which case `target_shape` refers to it as well. The result always
/// uses the declared axes order.
///
/// # Errors
///
/// Fails for dependents with different axes, for a shape that cannot be
/// determined, or if the reshaped data is not a valid meshgrid.
pub fn datadict_to_meshgrid(
    data: &DataDict,
    target_shape: Option<&[usize]>,
    inner_axis_order: Option<&[String]>,
) -> Result<MeshgridDataDict> {
    if data.is_empty() {
        return Ok(MeshgridDataDict::new());
    }
    if !data.compatible_axes() {
        return Err(DataDictError::IncompatibleAxes {
            message: "Non-compatible axes, cannot grid that.".to_string(),
        });
    }

    let expanded;
    let data = if data.is_expanded() {
        data
    } else {
        log::debug!("Expanding nested records before gridding");
        expanded = data.expand()?;
        &expanded
    };

    let axes = data.axes();
    if axes.is_empty() {
        return Err(DataDictError::GridInference {
            message: "No dependents with axes to grid.".to_string(),
        });
    }

    let (order, shape) = match (target_shape, inner_axis_order) {
        (Some(shape), Some(order)) => (order.to_vec(), shape.to_vec()),
        (Some(shape), None) => (axes.clone(), shape.to_vec()),
        (None, inner) => {
            let vals: Vec<(&str, &ArrayD<f64>)> = axes
                .iter()
                .map(|a| Ok((a.as_str(), data.data_vals(a)?)))
                .collect::<Result<_>>()?;
            match guess_grid_from_sweep_direction(&vals)? {
                Some((order, shape)) if !fits_unique_values(data, &order, &shape)? => {
                    log::debug!(
                        "Sweep guess {shape:?} (order {order:?}) has fewer points than unique values, guessing from unique values"
                    );
                    (axes.clone(), unique_value_shape(data)?)
                }
                Some((order, shape)) => {
                    if let Some(inner) = inner {
                        if inner != order.as_slice() {
                            log::warn!(
                                "Given inner axis order {inner:?} does not match sweep order {order:?}; using the latter"
                            );
                        }
                    }
                    (order, shape)
                }
                None => {
                    log::debug!("No sweep pattern found, guessing shape from unique values");
                    (axes.clone(), unique_value_shape(data)?)
                }
            }
        }
    };

    if shape.len() != axes.len() {
        return Err(DataDictError::InvalidShape {
            message: format!("target shape {shape:?} does not match the axes {axes:?}"),
        });
    }
    let perm: Vec<usize> = axes
        .iter()
        .map(|a| {
            order.iter().position(|o| o == a).ok_or_else(|| DataDictError::InvalidOrder {
                message: format!("'{a}' missing from inner axis order {order:?}"),
            })
        })
        .collect::<Result<_>>()?;
    if order.len() != axes.len() {
        return Err(DataDictError::InvalidOrder {
            message: format!("inner axis order {order:?} does not match the axes {axes:?}"),
        });
    }
    let transpose = perm.iter().enumerate().any(|(i, &p)| i != p);
    log::debug!("Gridding {} fields to shape {shape:?} (sweep order {order:?})", data.len());

    let mut grid = MeshgridDataDict::from_base(data.structure(false, true)?.into_base());
    for (name, field) in data.data_items() {
        let mut vals = array1d_to_meshgrid(&field.values, &shape)?;
        if transpose {
            vals = vals.permuted_axes(perm.clone()).as_standard_layout().into_owned();
        }
        grid.field_mut(name)?.values = vals;
    }

    grid.sanitize()?;
    grid.validate()?;
    Ok(grid)
}

/// Make tabular data from a meshgrid by flattening all fields.
pub fn meshgrid_to_datadict(data: &MeshgridDataDict) -> Result<DataDict> {
    let mut flat = DataDict::from_base(data.structure(false, true)?.into_base());
    for (name, field) in data.data_items() {
        flat.field_mut(name)?.values = Array1::from_iter(field.values.iter().copied()).into_dyn();
    }
    flat.sanitize()?;
    flat.validate()?;
    Ok(flat)
}
