//! Gridded data: every field holds an array of the grid's shape
//!
//! For a dependent `z` with axes `[x, y]`, `z`, `x` and `y` all have shape
//! `(nx, ny)`; `x` varies along the first dimension and `y` along the
//! second. All dependents share the same axes in the same order.

use crate::base::{order_from_positions, DataContainer, DataDictBase};
use crate::errors::{DataDictError, Result};
use crate::field::DataField;
use crate::reduction::{reduce_along_axis, ReductionMethod};
use ndarray::{ArrayD, Axis, Slice};
use std::ops::{Deref, DerefMut, Range};

/// Container for data on a regular grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshgridDataDict {
    base: DataDictBase,
}

impl Deref for MeshgridDataDict {
    type Target = DataDictBase;

    fn deref(&self) -> &DataDictBase {
        &self.base
    }
}

impl DerefMut for MeshgridDataDict {
    fn deref_mut(&mut self) -> &mut DataDictBase {
        &mut self.base
    }
}

/// Whether valid neighbours differ anywhere along `axis`; `None` if no pair is valid
fn varies_along(values: &ArrayD<f64>, axis: usize) -> Option<bool> {
    let mut seen = false;
    for lane in values.lanes(Axis(axis)) {
        let lane: Vec<f64> = lane.iter().copied().collect();
        for w in lane.windows(2) {
            let d = w[1] - w[0];
            if d.is_nan() {
                continue;
            }
            if d != 0.0 {
                return Some(true);
            }
            seen = true;
        }
    }
    if seen {
        Some(false)
    } else {
        None
    }
}

impl DataContainer for MeshgridDataDict {
    fn base(&self) -> &DataDictBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DataDictBase {
        &mut self.base
    }

    fn from_base(base: DataDictBase) -> Self {
        Self { base }
    }

    fn into_base(self) -> DataDictBase {
        self.base
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = self.base.dependency_problems();

        let mut axes: Option<(&String, &Vec<String>)> = None;
        for (name, field) in self.base.data_items().filter(|(_, f)| f.is_dependent()) {
            match axes {
                None => axes = Some((name, &field.axes)),
                Some((src, ax)) if *ax != field.axes => problems.push(format!(
                    "All dependents must have the same axes, but '{name}' has {:?} and '{src}' has {ax:?}",
                    field.axes
                )),
                Some(_) => {}
            }
        }

        let mut shape: Option<(&String, &[usize])> = None;
        for (name, field) in self.base.data_items() {
            match shape {
                None => shape = Some((name, field.values.shape())),
                Some((src, shp)) if shp != field.values.shape() => problems.push(format!(
                    "shapes need to match, but '{name}' has {:?}, and '{src}' has {shp:?}.",
                    field.values.shape()
                )),
                Some(_) => {}
            }
        }

        if !problems.is_empty() {
            return problems;
        }

        if let (Some((_, axes)), Some((_, shp))) = (axes, shape) {
            if shp.len() != axes.len() {
                problems.push(format!(
                    "grid has {} dimensions, but dependents have {} axes {axes:?}.",
                    shp.len(),
                    axes.len()
                ));
                return problems;
            }
            for (i, ax) in axes.iter().enumerate() {
                if shp[i] < 2 {
                    continue;
                }
                let Ok(values) = self.base.data_vals(ax) else {
                    continue;
                };
                if varies_along(values, i) == Some(false) {
                    problems.push(format!(
                        "'{ax}' is expected to be axis {i}, but has no variation along that dimension."
                    ));
                }
            }
            for (i, ax) in axes.iter().enumerate() {
                let Ok(values) = self.base.data_vals(ax) else {
                    continue;
                };
                for j in (0..axes.len()).filter(|&j| j != i && shp[j] > 1) {
                    if varies_along(values, j) == Some(true) {
                        problems.push(format!(
                            "'{ax}' is expected to be axis {i}, but varies along dimension {j} ('{}').",
                            axes[j]
                        ));
                    }
                }
            }
        }
        problems
    }
}

impl MeshgridDataDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a field
    #[must_use]
    pub fn with_field(mut self, name: &str, field: DataField) -> Self {
        self.base.add_field(name, field);
        self
    }

    /// Shape of the grid; `None` for an empty container
    pub fn shape(&self) -> Option<Vec<usize>> {
        self.base.data_items().next().map(|(_, f)| f.shape())
    }

    /// Axes shared by all dependents
    fn grid_axes(&self) -> Vec<String> {
        self.base
            .data_items()
            .find(|(_, f)| f.is_dependent())
            .map(|(_, f)| f.axes.clone())
            .unwrap_or_default()
    }

    fn axis_index(&self, axis: &str) -> Result<usize> {
        let axes = self.grid_axes();
        axes.iter()
            .position(|a| a == axis)
            .ok_or_else(|| DataDictError::invalid_input(format!("'{axis}' is not a grid axis (axes: {axes:?})")))
    }

    /// Reorder the grid axes, transposing all values accordingly.
    ///
    /// `positions` are `(axis, new_index)` pairs; see
    /// [`DataDictBase::new_order`].
    pub fn reorder_axes(&mut self, positions: &[(&str, usize)]) -> Result<()> {
        let axes = self.grid_axes();
        if axes.is_empty() {
            return Ok(());
        }
        let perm = order_from_positions(&axes, positions)?;
        let new_axes: Vec<String> = perm.iter().map(|&i| axes[i].clone()).collect();

        for (_, field) in self.base.data_items_mut() {
            if field.is_dependent() {
                field.axes = new_axes.clone();
            }
            if field.values.ndim() == perm.len() {
                let values = std::mem::take(&mut field.values);
                field.values = values
                    .permuted_axes(perm.clone())
                    .as_standard_layout()
                    .into_owned();
            }
        }
        self.validate()
    }

    /// Remove an axis by reducing every dependent along it.
    ///
    /// The remaining axes are constant along the removed dimension and keep
    /// their first slice.
    pub fn reduce(&self, axis: &str, method: ReductionMethod) -> Result<MeshgridDataDict> {
        let idx = self.axis_index(axis)?;
        let mut ret = self.clone();
        for (_, field) in ret.base.data_items_mut() {
            let field_method = if field.is_dependent() {
                method
            } else {
                ReductionMethod::ElementSelection(0)
            };
            field.values = reduce_along_axis(&field.values, idx, field_method)?;
            field.axes.retain(|a| a != axis);
        }
        ret.base.take_field(axis)?;
        ret.base.remove_unused_axes();
        ret.validate()?;
        Ok(ret)
    }

    /// Average over an axis, removing it
    pub fn mean(&self, axis: &str) -> Result<MeshgridDataDict> {
        self.reduce(axis, ReductionMethod::Average)
    }

    /// Restrict one axis to an index range
    pub fn slice(&self, axis: &str, range: Range<usize>) -> Result<MeshgridDataDict> {
        let idx = self.axis_index(axis)?;
        let len = self.shape().map(|s| s[idx]).unwrap_or(0);
        if range.start > range.end || range.end > len {
            return Err(DataDictError::invalid_input(format!(
                "range {range:?} out of bounds for axis '{axis}' of length {len}"
            )));
        }
        let mut ret = self.clone();
        for (_, field) in ret.base.data_items_mut() {
            field.values = field
                .values
                .slice_axis(Axis(idx), Slice::from(range.clone()))
                .to_owned();
        }
        ret.validate()?;
        Ok(ret)
    }

    /// Remove axes of length 1, keeping at least one axis
    pub fn squeeze(&self) -> Result<MeshgridDataDict> {
        let mut ret = self.clone();
        loop {
            let axes = ret.grid_axes();
            let Some(shape) = ret.shape() else {
                break;
            };
            if axes.len() < 2 {
                break;
            }
            match axes.iter().zip(&shape).find(|(_, &n)| n == 1) {
                Some((ax, _)) => ret = ret.reduce(ax, ReductionMethod::ElementSelection(0))?,
                None => break,
            }
        }
        Ok(ret)
    }
}
