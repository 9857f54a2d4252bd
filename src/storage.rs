//! NetCDF storage of tabular data
//!
//! A file holds any number of containers, one per NetCDF group (`data`
//! unless named otherwise). Layout of a group written by
//! [`datadict_to_netcdf_group`]:
//!
//! * one record dimension `__records__`;
//! * one `f64` variable per field, with dimensions `[__records__, inner...]`
//!   where the inner dimensions (`__{field}_{i}__`) hold nested records;
//! * variable attributes `unit` (omitted when empty) and `axes`;
//! * metadata (container and field level) as JSON text in `__name__`
//!   attributes, including `__creation_time_sec__`/`__creation_time_str__`
//!   and, after appending, `__last_change_time_sec__`/`__last_change_time_str__`.
//!
//! Writing rewrites the whole file; the other groups are kept as they were.

use crate::base::{same_structure, DataContainer};
use crate::datadict::DataDict;
use crate::errors::{DataDictError, Result};
use crate::field::{is_meta_key, meta_key_to_name, meta_name_to_key, DataField, Meta};
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use ndarray::{ArrayD, Axis, IxDyn, Slice};
use netcdf::{AttributeValue, FileMut, Group, GroupMut};
use serde_json::Value as JsonValue;
use std::{fs, path::Path};

/// Name of the record dimension of each group
pub const RECORD_DIM: &str = "__records__";

/// Group used when none is given
pub const DEFAULT_GROUP: &str = "data";

const TIME_KEYS: [&str; 4] = [
    "creation_time_sec",
    "creation_time_str",
    "last_change_time_sec",
    "last_change_time_str",
];

/// How to treat existing files when saving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendMode {
    /// Overwrite any existing file
    None,
    /// Append only the records beyond those already stored
    #[default]
    New,
    /// Append all records to the stored ones
    All,
}

/// Options for [`datadict_from_netcdf`]
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// First record to load
    pub start: usize,
    /// Record to stop before; `None` loads to the end
    pub stop: Option<usize>,
    /// Only load the structure (fields, units, axes, meta); values are empty
    pub structure_only: bool,
    /// Truncate all fields to the shortest one instead of failing
    pub ignore_unequal_lengths: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            start: 0,
            stop: None,
            structure_only: false,
            ignore_unequal_lengths: true,
        }
    }
}

fn time_meta(prefix: &str, t: DateTime<Local>) -> [(String, JsonValue); 2] {
    [
        (format!("{prefix}_sec"), JsonValue::from(t.timestamp() as f64 + f64::from(t.timestamp_subsec_millis()) / 1000.0)),
        (format!("{prefix}_str"), JsonValue::from(t.format("%Y-%m-%d %H:%M:%S").to_string())),
    ]
}

fn inner_dim_name(field: &str, i: usize) -> String {
    meta_name_to_key(&format!("{field}_{i}"))
}

fn check_group_name(group: &str) -> Result<()> {
    if group.is_empty() || group.contains('/') {
        return Err(DataDictError::invalid_input(format!("Invalid group name '{group}'")));
    }
    Ok(())
}

/// Save tabular data to the default group of a NetCDF file.
///
/// # Errors
///
/// See [`datadict_to_netcdf_group`].
pub fn datadict_to_netcdf(data: &DataDict, path: &Path, mode: AppendMode) -> Result<()> {
    datadict_to_netcdf_group(data, path, DEFAULT_GROUP, mode)
}

/// Save tabular data to a named group of a NetCDF file.
///
/// With [`AppendMode::None`] the group is replaced; otherwise records are
/// appended to the stored ones and the container metadata is updated.
///
/// # Errors
///
/// Fails if the data is invalid, if appending to a group with a different
/// structure, or on any file error.
pub fn datadict_to_netcdf_group(data: &DataDict, path: &Path, group: &str, mode: AppendMode) -> Result<()> {
    check_group_name(group)?;
    data.validate()?;
    let now = Local::now();

    let mut groups = if path.exists() {
        all_datadicts_from_netcdf(path, &LoadOptions::default())?
    } else {
        IndexMap::new()
    };

    if mode == AppendMode::None || !groups.contains_key(group) {
        let mut out = data.clone();
        for (key, value) in time_meta("creation_time", now) {
            set_default_meta(&mut out, &key, value)?;
        }
        log::info!("Writing {} records to {}:{group}", out.nrecords(), path.display());
        groups.insert(group.to_string(), out);
        return write_file(&groups, path);
    }
    let stored = groups.get_mut(group).ok_or_else(|| DataDictError::GroupNotFound {
        name: group.to_string(),
        path: path.display().to_string(),
    })?;

    let mut incoming = match mode {
        AppendMode::New if data.nrecords() <= stored.nrecords() => {
            log::debug!("No new records for {}:{group}", path.display());
            return Ok(());
        }
        AppendMode::New => records_from(data, stored.nrecords())?,
        _ => data.clone(),
    };

    incoming.clear_meta(None)?;
    if !same_structure(&[&*stored, &incoming], false) {
        return Err(DataDictError::IncompatibleStructure {
            message: format!("cannot append to {}:{group}: fields, units or axes differ", path.display()),
        });
    }

    let added = incoming.nrecords();
    stored.append(&incoming)?;
    for (key, value) in data.meta_items().filter(|(k, _)| !TIME_KEYS.contains(&k.as_str())) {
        stored.add_meta(key, value.clone());
    }
    for (key, value) in time_meta("last_change_time", now) {
        stored.add_meta(&key, value);
    }
    log::info!("Appending {added} records to {}:{group}", path.display());
    write_file(&groups, path)
}

/// Add `key` to the container meta and every field, unless already set
fn set_default_meta(data: &mut DataDict, key: &str, value: JsonValue) -> Result<()> {
    if data.meta_val(key).is_err() {
        data.add_meta(key, value.clone());
    }
    for name in data.field_names() {
        if data.field_meta_val(&name, key).is_err() {
            data.add_field_meta(&name, key, value.clone())?;
        }
    }
    Ok(())
}

/// Records `start..` of every field
fn records_from(data: &DataDict, start: usize) -> Result<DataDict> {
    let mut ret = data.clone();
    for (_, field) in ret.data_items_mut() {
        field.values = field.values.slice_axis(Axis(0), Slice::from(start..)).to_owned();
    }
    ret.validate()?;
    Ok(ret)
}

fn put_meta(meta: &Meta, mut put: impl FnMut(&str, String) -> Result<()>) -> Result<()> {
    for (key, value) in meta {
        put(&meta_name_to_key(key), serde_json::to_string(value)?)?;
    }
    Ok(())
}

fn write_file(groups: &IndexMap<String, DataDict>, path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    let mut file: FileMut = netcdf::create(path)?;
    for (name, data) in groups {
        let mut group = file.add_group(name)?;
        write_group(&mut group, data)?;
    }
    file.add_attribute(
        "history",
        format!("Created by datadict on {}", chrono::Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

fn write_group(group: &mut GroupMut<'_>, data: &DataDict) -> Result<()> {
    group.add_dimension(RECORD_DIM, data.nrecords())?;
    for (name, field) in data.data_items() {
        for (i, &len) in field.values.shape().iter().enumerate().skip(1) {
            group.add_dimension(&inner_dim_name(name, i), len)?;
        }
    }

    for (name, field) in data.data_items() {
        let dims: Vec<String> = std::iter::once(RECORD_DIM.to_string())
            .chain((1..field.values.ndim()).map(|i| inner_dim_name(name, i)))
            .collect();
        let dim_refs: Vec<&str> = dims.iter().map(String::as_str).collect();

        let mut var = group.add_variable::<f64>(name, &dim_refs)?;
        if !field.unit.is_empty() {
            var.put_attribute("unit", field.unit.as_str())?;
        }
        if !field.axes.is_empty() {
            var.put_attribute("axes", field.axes.clone())?;
        }
        put_meta(&field.meta, |key, value| {
            var.put_attribute(key, value)?;
            Ok(())
        })?;
        if !field.values.is_empty() {
            let values = field.values.as_standard_layout();
            var.put(values.view(), ..)?;
        }
    }

    put_meta(data.meta(), |key, value| {
        group.add_attribute(key, value)?;
        Ok(())
    })
}

fn parse_meta_value(text: String) -> JsonValue {
    serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
}

/// Metadata entries (`__name__` attributes holding text)
fn read_meta(attrs: impl Iterator<Item = (String, AttributeValue)>) -> Meta {
    let mut meta = Meta::new();
    for (key, value) in attrs {
        let Some(name) = meta_key_to_name(&key) else {
            continue;
        };
        let value = match value {
            AttributeValue::Str(s) => parse_meta_value(s),
            AttributeValue::Double(v) => JsonValue::from(v),
            AttributeValue::Int(v) => JsonValue::from(v),
            _ => {
                log::warn!("Skipped unsupported meta attribute type for '{key}'");
                continue;
            }
        };
        meta.insert(name.to_string(), value);
    }
    meta
}

fn attribute_values<'f>(attrs: impl Iterator<Item = netcdf::Attribute<'f>>) -> Result<Vec<(String, AttributeValue)>> {
    let mut out = Vec::new();
    for attr in attrs {
        if is_meta_key(attr.name()) || matches!(attr.name(), "unit" | "axes") {
            out.push((attr.name().to_string(), attr.value()?));
        }
    }
    Ok(out)
}

/// Names of the groups stored in a NetCDF file
///
/// # Errors
///
/// Fails if the file cannot be opened.
pub fn group_names(path: &Path) -> Result<Vec<String>> {
    let file = netcdf::open(path)?;
    let names = file.groups()?.map(|g| g.name()).collect();
    Ok(names)
}

/// Load tabular data from the default group of a NetCDF file.
///
/// # Errors
///
/// See [`datadict_from_netcdf_group`].
pub fn datadict_from_netcdf(path: &Path, options: &LoadOptions) -> Result<DataDict> {
    datadict_from_netcdf_group(path, DEFAULT_GROUP, options)
}

/// Load tabular data from a named group of a NetCDF file.
///
/// # Errors
///
/// Fails on file errors, for a missing group, if fields have unequal record
/// counts (unless `ignore_unequal_lengths`), or if the loaded data is invalid.
pub fn datadict_from_netcdf_group(path: &Path, group: &str, options: &LoadOptions) -> Result<DataDict> {
    let file = netcdf::open(path)?;
    let grp = file.group(group)?.ok_or_else(|| DataDictError::GroupNotFound {
        name: group.to_string(),
        path: path.display().to_string(),
    })?;
    log::info!("Loading {}:{group}", path.display());
    read_group(&grp, options)
}

/// Load every group of a NetCDF file, keyed by group name.
///
/// # Errors
///
/// Fails on file errors or if any group cannot be loaded.
pub fn all_datadicts_from_netcdf(path: &Path, options: &LoadOptions) -> Result<IndexMap<String, DataDict>> {
    let file = netcdf::open(path)?;
    let mut ret = IndexMap::new();
    for grp in file.groups()? {
        let name = grp.name();
        log::debug!("Loading {}:{name}", path.display());
        let data = read_group(&grp, options)?;
        ret.insert(name, data);
    }
    Ok(ret)
}

fn read_group(group: &Group<'_>, options: &LoadOptions) -> Result<DataDict> {
    let mut data = DataDict::new();
    let mut lengths: Vec<(String, usize)> = Vec::new();

    for var in group.variables() {
        let name = var.name();
        let shape: Vec<usize> = var.dimensions().iter().map(netcdf::Dimension::len).collect();
        if shape.is_empty() {
            log::warn!("Skipping scalar variable '{name}'");
            continue;
        }

        let mut field = DataField::empty();
        let attrs = attribute_values(var.attributes())?;
        for (key, value) in &attrs {
            match (key.as_str(), value) {
                ("unit", AttributeValue::Str(s)) => field.unit = s.clone(),
                ("axes", AttributeValue::Strs(v)) => field.axes = v.clone(),
                ("axes", AttributeValue::Str(s)) => field.axes = vec![s.clone()],
                _ => {}
            }
        }
        field.meta = read_meta(attrs.into_iter());

        field.values = if options.structure_only {
            let mut empty = shape.clone();
            empty[0] = 0;
            ArrayD::zeros(IxDyn(&empty))
        } else if shape.iter().product::<usize>() == 0 {
            ArrayD::zeros(IxDyn(&shape))
        } else {
            let values = var.get_values::<f64, _>(..)?;
            ArrayD::from_shape_vec(IxDyn(&shape), values)?
        };
        lengths.push((name.clone(), shape[0]));
        data.add_field(&name, field);
    }

    let attrs: Vec<(String, AttributeValue)> = attribute_values(group.attributes())?;
    for (key, value) in read_meta(attrs.into_iter()) {
        data.add_meta(&key, value);
    }

    if !options.structure_only {
        let min = lengths.iter().map(|(_, n)| *n).min().unwrap_or(0);
        if lengths.iter().any(|(_, n)| *n != min) {
            if !options.ignore_unequal_lengths {
                return Err(DataDictError::InvalidShape {
                    message: format!("fields have unequal record counts: {lengths:?}"),
                });
            }
            log::warn!("Truncating all fields to {min} records");
        }
        let start = options.start.min(min);
        let stop = options.stop.unwrap_or(min).clamp(start, min);
        for (_, field) in data.data_items_mut() {
            field.values = field
                .values
                .slice_axis(Axis(0), Slice::from(start..stop))
                .to_owned();
        }
    }

    data.validate()?;
    Ok(data)
}
