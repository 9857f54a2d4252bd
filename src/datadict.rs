//! Tabular data: one record per index of the leading array dimension
//!
//! For a dependent `z` with axes `x` and `y`, record `i` is the point
//! `(x[i], y[i]) -> z[i]`. All fields must have the same number of records.
//! Records may be nested: `z[i]` can itself be an array (trailing
//! dimensions), which [`DataDict::expand`] flattens into scalar records.

use crate::base::{same_structure, DataContainer, DataDictBase};
use crate::errors::{DataDictError, Result};
use crate::field::DataField;
use crate::reduction::{nan_mean, nan_median, nan_min_max, nan_std};
use ndarray::{concatenate, ArrayD, Axis, IxDyn};
use std::ops::{Deref, DerefMut};

/// Container for data in record ("linear") form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataDict {
    base: DataDictBase,
}

impl Deref for DataDict {
    type Target = DataDictBase;

    fn deref(&self) -> &DataDictBase {
        &self.base
    }
}

impl DerefMut for DataDict {
    fn deref_mut(&mut self) -> &mut DataDictBase {
        &mut self.base
    }
}

impl DataContainer for DataDict {
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

        let mut reference: Option<(&String, usize)> = None;
        for (name, field) in self.base.data_items() {
            if field.values.ndim() == 0 {
                problems.push(format!("'{name}' has 0-dimensional values; records need a leading dimension."));
                continue;
            }
            let n = field.values.len_of(Axis(0));
            match reference {
                None => reference = Some((name, n)),
                Some((src, nvals)) if nvals != n => problems.push(format!(
                    "'{name}' has length {n}, but have found {nvals} in '{src}'"
                )),
                Some(_) => {}
            }
        }
        problems
    }

    fn sanitize(&mut self) -> Result<()> {
        self.base.remove_unused_axes();
        self.remove_invalid_entries()
    }
}

fn inner_shape(field: &DataField) -> &[usize] {
    let shape = field.values.shape();
    if shape.is_empty() {
        shape
    } else {
        &shape[1..]
    }
}

fn records(values: &ArrayD<f64>) -> usize {
    if values.ndim() == 0 {
        0
    } else {
        values.len_of(Axis(0))
    }
}

impl DataDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a field
    #[must_use]
    pub fn with_field(mut self, name: &str, field: DataField) -> Self {
        self.base.add_field(name, field);
        self
    }

    /// Number of records (0 for an empty container)
    pub fn nrecords(&self) -> usize {
        self.base
            .data_items()
            .next()
            .map(|(_, f)| records(&f.values))
            .unwrap_or(0)
    }

    /// Add records to every field.
    ///
    /// Values must be given for all fields of the container and must be
    /// consistent among themselves (equal record counts). Record inner
    /// shapes must match the existing data.
    pub fn add_data(&mut self, new_records: &[(&str, ArrayD<f64>)]) -> Result<()> {
        let missing: Vec<String> = self
            .base
            .field_names()
            .into_iter()
            .filter(|n| !new_records.iter().any(|(r, _)| *r == n.as_str()))
            .collect();
        if !missing.is_empty() {
            return Err(DataDictError::invalid_input(format!(
                "Values for all fields must be given; missing {missing:?}"
            )));
        }

        let mut new = self.structure(false, false)?;
        for (name, values) in new_records {
            new.field_mut(name)?.values = values.clone();
        }
        new.validate()?;
        self.append(&new)
    }

    /// Append the records of `other` to this container, in place.
    pub fn append(&mut self, other: &DataDict) -> Result<()> {
        if !same_structure(&[&*self, other], false) {
            return Err(DataDictError::IncompatibleStructure {
                message: "fields, units and axes must match to append".to_string(),
            });
        }
        let mut merged: Vec<(String, ArrayD<f64>)> = Vec::with_capacity(self.len());
        for (name, field) in self.base.data_items() {
            let add = &other.field(name)?.values;
            let values = if records(&field.values) == 0 {
                add.clone()
            } else if records(add) == 0 {
                field.values.clone()
            } else {
                concatenate(Axis(0), &[field.values.view(), add.view()])?
            };
            merged.push((name.clone(), values));
        }
        for (name, values) in merged {
            self.field_mut(&name)?.values = values;
        }
        self.validate()
    }

    /// New container holding the records of `self` followed by those of `other`
    pub fn concat(&self, other: &DataDict) -> Result<DataDict> {
        let mut ret = self.clone();
        ret.append(other)?;
        Ok(ret)
    }

    /// Remove all records that are invalid in *all* dependents.
    ///
    /// A nested record counts as invalid if all of its elements are.
    pub fn remove_invalid_entries(&mut self) -> Result<()> {
        let dependents = self.dependents();
        if dependents.is_empty() {
            return Ok(());
        }
        let n = self.nrecords();

        let mut invalid = vec![true; n];
        for dep in &dependents {
            let values = &self.field(dep)?.values;
            if values.ndim() == 0 || values.len_of(Axis(0)) != n {
                return Err(DataDictError::InvalidShape {
                    message: format!("'{dep}' does not have {n} records"),
                });
            }
            for (i, rec) in values.axis_iter(Axis(0)).enumerate() {
                invalid[i] &= rec.iter().all(|v| v.is_nan());
            }
        }

        let keep: Vec<usize> = (0..n).filter(|&i| !invalid[i]).collect();
        if keep.len() == n {
            return Ok(());
        }
        log::debug!("Removing {} invalid records", n - keep.len());
        for (_, field) in self.base.data_items_mut() {
            field.values = field.values.select(Axis(0), &keep);
        }
        Ok(())
    }

    /// True if every record of every field is a scalar
    pub fn is_expanded(&self) -> bool {
        self.base
            .data_items()
            .all(|(_, f)| inner_shape(f).is_empty())
    }

    /// Flatten nested records so that every record is a scalar.
    ///
    /// Fields with scalar records are repeated to match the nested ones. All
    /// nested fields must have the same number of elements per record.
    pub fn expand(&self) -> Result<DataDict> {
        if self.is_expanded() {
            return Ok(self.clone());
        }
        let size = self
            .base
            .data_items()
            .map(|(_, f)| inner_shape(f).iter().product::<usize>())
            .max()
            .unwrap_or(1);
        let n = self.nrecords();

        let mut ret = self.clone();
        for (name, field) in ret.base.data_items_mut() {
            let inner: usize = inner_shape(field).iter().product();
            let flat: Vec<f64> = if inner == 1 {
                field
                    .values
                    .iter()
                    .flat_map(|&v| std::iter::repeat(v).take(size))
                    .collect()
            } else if inner == size {
                field.values.iter().copied().collect()
            } else {
                return Err(DataDictError::InvalidShape {
                    message: format!("Cannot expand '{name}': {inner} elements per record, expected {size}"),
                });
            };
            field.values = ArrayD::from_shape_vec(IxDyn(&[n * size]), flat)?;
        }
        ret.validate()?;
        Ok(ret)
    }

    // basic statistics over all valid values of a field

    pub fn avg(&self, name: &str) -> Option<f64> {
        self.field(name).ok().and_then(|f| nan_mean(&f.values))
    }

    pub fn std(&self, name: &str) -> Option<f64> {
        self.field(name).ok().and_then(|f| nan_std(&f.values))
    }

    pub fn med(&self, name: &str) -> Option<f64> {
        self.field(name).ok().and_then(|f| nan_median(&f.values))
    }

    /// Rescale a field linearly so that its minimum is 0 and its maximum 1
    pub fn normalize(&mut self, name: &str) -> Result<()> {
        let field = self.field_mut(name)?;
        let (min, max) = nan_min_max(&field.values).ok_or_else(|| {
            DataDictError::invalid_input(format!("'{name}' has no valid values to normalize"))
        })?;
        if max == min {
            return Err(DataDictError::invalid_input(format!(
                "'{name}' is constant and cannot be normalized"
            )));
        }
        field.values.mapv_inplace(|v| (v - min) / (max - min));
        Ok(())
    }
}
