//! The dependency-aware container shared by all data dicts
//!
//! [`DataDictBase`] maps field names to [`DataField`]s (in insertion order)
//! and carries container-level metadata. It makes no assumption about the
//! layout of the values; that is the job of the specialisations
//! ([`crate::DataDict`] and [`crate::MeshgridDataDict`]), which plug into the
//! generic operations through the [`DataContainer`] trait.
//!
//! The dependency graph is exactly two layers deep: dependents list axes, and
//! axes list nothing.

use crate::errors::{DataDictError, Result};
use crate::field::{DataField, Meta};
use indexmap::IndexMap;
use ndarray::ArrayD;
use serde_json::Value as JsonValue;

/// Generic field container without assumptions on the value layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataDictBase {
    fields: IndexMap<String, DataField>,
    meta: Meta,
}

impl DataDictBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a field
    #[must_use]
    pub fn with_field(mut self, name: &str, field: DataField) -> Self {
        self.add_field(name, field);
        self
    }

    /// Insert (or replace) a field. Replacing keeps the original position.
    pub fn add_field(&mut self, name: &str, field: DataField) {
        self.fields.insert(name.to_string(), field);
    }

    pub fn field(&self, name: &str) -> Result<&DataField> {
        self.fields
            .get(name)
            .ok_or_else(|| DataDictError::field_not_found(name))
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut DataField> {
        self.fields
            .get_mut(name)
            .ok_or_else(|| DataDictError::field_not_found(name))
    }

    /// Remove a field, preserving the order of the remaining ones
    pub fn take_field(&mut self, name: &str) -> Result<DataField> {
        self.fields
            .shift_remove(name)
            .ok_or_else(|| DataDictError::field_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of data fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn data_items(&self) -> impl Iterator<Item = (&String, &DataField)> {
        self.fields.iter()
    }

    pub fn data_items_mut(&mut self) -> impl Iterator<Item = (&String, &mut DataField)> {
        self.fields.iter_mut()
    }

    pub fn data_vals(&self, name: &str) -> Result<&ArrayD<f64>> {
        Ok(&self.field(name)?.values)
    }

    // meta data

    pub fn meta_items(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.meta.iter()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn field_meta(&self, name: &str) -> Result<&Meta> {
        Ok(&self.field(name)?.meta)
    }

    pub fn add_meta(&mut self, key: &str, value: impl Into<JsonValue>) {
        self.meta.insert(key.to_string(), value.into());
    }

    pub fn add_field_meta(&mut self, name: &str, key: &str, value: impl Into<JsonValue>) -> Result<()> {
        self.field_mut(name)?
            .meta
            .insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn meta_val(&self, key: &str) -> Result<&JsonValue> {
        self.meta.get(key).ok_or_else(|| DataDictError::MetaNotFound {
            key: key.to_string(),
            field: None,
        })
    }

    pub fn field_meta_val(&self, name: &str, key: &str) -> Result<&JsonValue> {
        self.field(name)?
            .meta
            .get(key)
            .ok_or_else(|| DataDictError::MetaNotFound {
                key: key.to_string(),
                field: Some(name.to_string()),
            })
    }

    pub fn delete_meta(&mut self, key: &str) -> Result<JsonValue> {
        self.meta
            .shift_remove(key)
            .ok_or_else(|| DataDictError::MetaNotFound {
                key: key.to_string(),
                field: None,
            })
    }

    pub fn delete_field_meta(&mut self, name: &str, key: &str) -> Result<JsonValue> {
        self.field_mut(name)?
            .meta
            .shift_remove(key)
            .ok_or_else(|| DataDictError::MetaNotFound {
                key: key.to_string(),
                field: Some(name.to_string()),
            })
    }

    /// Delete meta information.
    ///
    /// With `Some(field)` only that field's metadata is removed. With `None`
    /// the container metadata and the metadata of every field are removed.
    pub fn clear_meta(&mut self, field: Option<&str>) -> Result<()> {
        match field {
            Some(name) => self.field_mut(name)?.meta.clear(),
            None => {
                self.meta.clear();
                for field in self.fields.values_mut() {
                    field.meta.clear();
                }
            }
        }
        Ok(())
    }

    // info about structure

    /// All independents referenced by any dependent, in order of first reference
    pub fn axes(&self) -> Vec<String> {
        let dependents: Vec<&String> = self
            .fields
            .iter()
            .filter(|(_, f)| f.is_dependent())
            .map(|(n, _)| n)
            .collect();
        self.collect_axes(dependents)
    }

    /// The independents referenced by the given fields
    pub fn axes_of<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        let mut refs = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !self.contains(name) {
                return Err(DataDictError::field_not_found(name));
            }
            refs.push(name);
        }
        Ok(self.collect_axes(refs))
    }

    fn collect_axes<S: AsRef<str>>(&self, names: Vec<S>) -> Vec<String> {
        let mut axes: Vec<String> = Vec::new();
        for name in names {
            let Some(field) = self.fields.get(name.as_ref()) else {
                continue;
            };
            for ax in &field.axes {
                let independent = self
                    .fields
                    .get(ax)
                    .map(|f| !f.is_dependent())
                    .unwrap_or(false);
                if independent && !axes.contains(ax) {
                    axes.push(ax.clone());
                }
            }
        }
        axes
    }

    pub fn dependents(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, f)| f.is_dependent())
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn shapes(&self) -> IndexMap<String, Vec<usize>> {
        self.fields
            .iter()
            .map(|(n, f)| (n.clone(), f.shape()))
            .collect()
    }

    /// Total size of all value arrays in bytes
    pub fn nbytes(&self) -> usize {
        self.fields
            .values()
            .map(|f| f.values.len() * std::mem::size_of::<f64>())
            .sum()
    }

    /// Name of a field with its unit, e.g. `"x (V)"`
    pub fn label(&self, name: &str) -> Result<String> {
        let field = self.field(name)?;
        if field.unit.is_empty() {
            Ok(name.to_string())
        } else {
            Ok(format!("{} ({})", name, field.unit))
        }
    }

    /// True if all dependents have the very same axes, in the same order
    pub fn compatible_axes(&self) -> bool {
        let mut deps = self.fields.values().filter(|f| f.is_dependent());
        match deps.next() {
            Some(first) => deps.all(|f| f.axes == first.axes),
            None => true,
        }
    }

    // validation and sanitizing

    /// Problems with the dependency graph; empty if it is well-formed.
    pub(crate) fn dependency_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, field) in &self.fields {
            for (i, ax) in field.axes.iter().enumerate() {
                match self.fields.get(ax) {
                    None => problems.push(format!(
                        "'{name}' has axis '{ax}', but no field with name '{ax}' registered."
                    )),
                    Some(axfield) if axfield.is_dependent() => problems.push(format!(
                        "'{name}' has axis '{ax}', but '{ax}' is not independent."
                    )),
                    Some(_) => {}
                }
                if field.axes[..i].contains(ax) {
                    problems.push(format!("'{name}' lists axis '{ax}' more than once."));
                }
            }
        }
        problems
    }

    /// Remove all independents that no dependent refers to.
    ///
    /// A container without any dependent is left untouched.
    pub fn remove_unused_axes(&mut self) {
        let dependents = self.dependents();
        if dependents.is_empty() {
            return;
        }
        let used: Vec<String> = self
            .fields
            .values()
            .flat_map(|f| f.axes.iter().cloned())
            .collect();
        let before = self.fields.len();
        self.fields
            .retain(|name, field| field.is_dependent() || used.contains(name));
        if self.fields.len() < before {
            log::debug!("Removed {} unused axes", before - self.fields.len());
        }
    }

    // axes order tools

    /// Order of axes after moving the given axes to new positions.
    ///
    /// `positions` are `(axis, new_index)` pairs; axes not mentioned keep
    /// their relative order. Returns the permutation (indices into the
    /// current axes list) and the new axes list.
    pub fn new_order(&self, name: &str, positions: &[(&str, usize)]) -> Result<(Vec<usize>, Vec<String>)> {
        let axes = &self.field(name)?.axes;
        let perm = order_from_positions(axes, positions)?;
        let new_axes = perm.iter().map(|&i| axes[i].clone()).collect();
        Ok((perm, new_axes))
    }

    /// Reorder the axes lists of the given dependents (all when `None`).
    ///
    /// Values are not touched; see [`crate::MeshgridDataDict::reorder_axes`]
    /// for gridded data.
    pub fn reorder_axes(&mut self, names: Option<&[&str]>, positions: &[(&str, usize)]) -> Result<()> {
        let names: Vec<String> = match names {
            Some(n) => n.iter().map(|s| s.to_string()).collect(),
            None => self.dependents(),
        };
        for name in &names {
            let (_, new_axes) = self.new_order(name, positions)?;
            self.field_mut(name)?.axes = new_axes;
        }
        Ok(())
    }
}

/// Permutation that moves the named entries of `list` to new positions.
pub(crate) fn order_from_positions(list: &[String], positions: &[(&str, usize)]) -> Result<Vec<usize>> {
    let mut used = Vec::new();
    for &(item, idx) in positions {
        if used.contains(&idx) {
            return Err(DataDictError::InvalidOrder {
                message: "Order indices have to be unique.".to_string(),
            });
        }
        if idx >= list.len() {
            return Err(DataDictError::InvalidOrder {
                message: format!("Position {idx} for '{item}' is out of range (have {} axes).", list.len()),
            });
        }
        if !list.iter().any(|a| a == item) {
            return Err(DataDictError::InvalidOrder {
                message: format!("'{item}' is not among the axes {list:?}."),
            });
        }
        used.push(idx);
    }

    let mut target: Vec<&str> = list.iter().map(String::as_str).collect();
    for &(item, idx) in positions {
        if let Some(old) = target.iter().position(|a| *a == item) {
            let moved = target.remove(old);
            target.insert(idx, moved);
        }
    }

    Ok(target
        .iter()
        .filter_map(|t| list.iter().position(|a| a == t))
        .collect())
}

/// Operations shared by every kind of data dict.
///
/// Implementors supply access to the underlying [`DataDictBase`] and their
/// own validation rules; extraction and structure copies are built on top.
pub trait DataContainer: Sized + Clone {
    fn base(&self) -> &DataDictBase;

    fn base_mut(&mut self) -> &mut DataDictBase;

    /// Wrap a base container without validating it
    fn from_base(base: DataDictBase) -> Self;

    fn into_base(self) -> DataDictBase;

    /// Every violated invariant, as human readable messages
    fn problems(&self) -> Vec<String>;

    fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DataDictError::Validation(problems))
        }
    }

    fn sanitize(&mut self) -> Result<()> {
        self.base_mut().remove_unused_axes();
        Ok(())
    }

    /// New container with the given fields, plus the axes they depend on.
    fn extract<S: AsRef<str>>(&self, names: &[S], include_meta: bool, sanitize: bool) -> Result<Self> {
        let base = self.base();
        let mut wanted: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            let field = base.field(name)?;
            if !wanted.iter().any(|w| w == name) {
                wanted.push(name.to_string());
            }
            for ax in &field.axes {
                if !wanted.contains(ax) {
                    wanted.push(ax.clone());
                }
            }
        }

        let mut ret = DataDictBase::new();
        for (name, field) in base.data_items() {
            if wanted.contains(name) {
                ret.add_field(name, field.clone());
            }
        }
        if include_meta {
            ret.meta = base.meta.clone();
        }

        let mut ret = Self::from_base(ret);
        if sanitize {
            ret.sanitize()?;
        }
        ret.validate()?;
        Ok(ret)
    }

    /// Copy of the container without values.
    ///
    /// With `add_shape`, every field gets a `shape` metadata entry holding the
    /// shape of its values. Without `include_meta`, all other metadata is
    /// dropped.
    fn structure(&self, add_shape: bool, include_meta: bool) -> Result<Self> {
        self.validate()?;
        let base = self.base();
        let mut s = DataDictBase::new();
        for (name, field) in base.data_items() {
            s.add_field(name, field.without_values());
        }
        if include_meta {
            s.meta = base.meta.clone();
        } else {
            s.clear_meta(None)?;
        }
        if add_shape {
            for (name, field) in base.data_items() {
                s.add_field_meta(name, "shape", field.shape())?;
            }
        }
        Ok(Self::from_base(s))
    }
}

impl DataContainer for DataDictBase {
    fn base(&self) -> &DataDictBase {
        self
    }

    fn base_mut(&mut self) -> &mut DataDictBase {
        self
    }

    fn from_base(base: DataDictBase) -> Self {
        base
    }

    fn into_base(self) -> DataDictBase {
        self
    }

    fn problems(&self) -> Vec<String> {
        self.dependency_problems()
    }
}

/// Check whether all containers share the same structure.
///
/// Compares field names, units and axes; metadata and values are ignored.
/// With `check_shape`, value shapes must match too.
pub fn same_structure<C: DataContainer>(dicts: &[&C], check_shape: bool) -> bool {
    let Some((first, rest)) = dicts.split_first() else {
        return true;
    };
    let first = first.base();
    rest.iter().all(|other| {
        let other = other.base();
        if other.len() != first.len() {
            return false;
        }
        first.data_items().all(|(name, field)| match other.fields.get(name) {
            Some(o) => field.same_layout(o) && (!check_shape || field.shape() == o.shape()),
            None => false,
        })
    })
}
