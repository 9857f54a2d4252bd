//! Tests for saving and loading NetCDF files

use datadict::num::arrays_equal;
use datadict::prelude::*;
use datadict::{group_names, same_structure, testdata};
use ndarray::{arr2, Axis, Slice};
use tempfile::tempdir;

fn first_records(data: &DataDict, n: usize) -> DataDict {
    let mut ret = data.clone();
    for (_, field) in ret.data_items_mut() {
        field.values = field.values.slice_axis(Axis(0), Slice::from(0..n)).to_owned();
    }
    ret
}

fn assert_same_values(a: &DataDict, b: &DataDict) -> Result<()> {
    assert_eq!(a.field_names(), b.field_names());
    for name in a.field_names() {
        assert!(arrays_equal(a.data_vals(&name)?, b.data_vals(&name)?, 1e-12), "values of '{name}' differ");
    }
    Ok(())
}

#[test]
fn test_save_and_load() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("data.nc");

    let mut data = testdata::three_compatible_3d_sets(2, 3, 4, 1.0)?;
    data.add_meta("info", "some information");
    data.add_meta("settings", serde_json::json!({"power": -20, "averages": 10}));
    data.add_field_meta("data", "calibrated", true)?;
    datadict_to_netcdf(&data, &path, AppendMode::None)?;

    let loaded = datadict_from_netcdf(&path, &LoadOptions::default())?;
    assert!(same_structure(&[&data, &loaded], true));
    assert_same_values(&data, &loaded)?;
    assert_eq!(loaded.field("more_data")?.unit, "MV");
    assert_eq!(loaded.field("different_data")?.axes, vec!["x", "y", "z"]);

    assert_eq!(loaded.meta_val("info")?, &serde_json::json!("some information"));
    assert_eq!(loaded.meta_val("settings")?["averages"], serde_json::json!(10));
    assert_eq!(loaded.field_meta_val("data", "calibrated")?, &serde_json::json!(true));
    assert!(loaded.meta_val("creation_time_sec")?.is_number());
    assert!(loaded.field_meta_val("x", "creation_time_str")?.is_string());
    Ok(())
}

#[test]
fn test_nested_records_and_invalid_values() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nested.nc");

    let data = DataDict::new()
        .with_field("x", DataField::from_vec(vec![0.0, 1.0, 2.0]).with_unit("s"))
        .with_field(
            "trace",
            DataField::new(arr2(&[[1.0, 2.0], [f64::NAN, 4.0], [5.0, 6.0]]).into_dyn()).with_axes(&["x"]),
        );
    datadict_to_netcdf(&data, &path, AppendMode::None)?;

    let loaded = datadict_from_netcdf(&path, &LoadOptions::default())?;
    assert_eq!(loaded.field("trace")?.shape(), vec![3, 2]);
    assert!(loaded.data_vals("trace")?[[1, 0]].is_nan());
    assert_same_values(&data, &loaded)
}

#[test]
fn test_append_modes() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("appended.nc");
    let full = testdata::two_1d_traces(10)?;

    datadict_to_netcdf(&first_records(&full, 4), &path, AppendMode::New)?;
    assert_eq!(datadict_from_netcdf(&path, &LoadOptions::default())?.nrecords(), 4);

    // only the records beyond the stored ones are added
    datadict_to_netcdf(&full, &path, AppendMode::New)?;
    let loaded = datadict_from_netcdf(&path, &LoadOptions::default())?;
    assert_eq!(loaded.nrecords(), 10);
    assert_same_values(&full, &loaded)?;
    assert!(loaded.meta_val("last_change_time_str")?.is_string());
    assert!(loaded.meta_val("creation_time_str")?.is_string());

    // nothing new
    datadict_to_netcdf(&full, &path, AppendMode::New)?;
    assert_eq!(datadict_from_netcdf(&path, &LoadOptions::default())?.nrecords(), 10);

    datadict_to_netcdf(&full, &path, AppendMode::All)?;
    let loaded = datadict_from_netcdf(&path, &LoadOptions::default())?;
    assert_eq!(loaded.nrecords(), 20);
    assert_eq!(loaded.data_vals("y")?[[12]], full.data_vals("y")?[[2]]);

    datadict_to_netcdf(&full, &path, AppendMode::None)?;
    let loaded = datadict_from_netcdf(&path, &LoadOptions::default())?;
    assert_eq!(loaded.nrecords(), 10);
    assert!(loaded.meta_val("last_change_time_str").is_err());
    Ok(())
}

#[test]
fn test_append_incompatible_structure() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("data.nc");
    let data = testdata::two_1d_traces(5)?;
    datadict_to_netcdf(&data, &path, AppendMode::None)?;

    let mut other_unit = data.clone();
    other_unit.field_mut("y")?.unit = "V".to_string();
    assert!(matches!(
        datadict_to_netcdf(&other_unit, &path, AppendMode::All),
        Err(DataDictError::IncompatibleStructure { .. })
    ));

    let fewer_fields = data.extract(&["y"], true, true)?;
    assert!(datadict_to_netcdf(&fewer_fields, &path, AppendMode::All).is_err());

    // the stored file is left as it was
    let loaded = datadict_from_netcdf(&path, &LoadOptions::default())?;
    assert_same_values(&data, &loaded)
}

#[test]
fn test_load_options() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("data.nc");
    let data = testdata::two_1d_traces(10)?;
    datadict_to_netcdf(&data, &path, AppendMode::None)?;

    let part = datadict_from_netcdf(
        &path,
        &LoadOptions {
            start: 2,
            stop: Some(5),
            ..LoadOptions::default()
        },
    )?;
    assert_eq!(part.nrecords(), 3);
    assert_eq!(part.data_vals("x")?[[0]], data.data_vals("x")?[[2]]);

    let tail = datadict_from_netcdf(
        &path,
        &LoadOptions {
            start: 8,
            stop: Some(100),
            ..LoadOptions::default()
        },
    )?;
    assert_eq!(tail.nrecords(), 2);

    let structure = datadict_from_netcdf(
        &path,
        &LoadOptions {
            structure_only: true,
            ..LoadOptions::default()
        },
    )?;
    assert_eq!(structure.nrecords(), 0);
    assert_eq!(structure.field_names(), data.field_names());
    assert_eq!(structure.field("z")?.axes, vec!["x"]);
    Ok(())
}

#[test]
fn test_missing_file() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("missing.nc");
    assert!(datadict_from_netcdf(&path, &LoadOptions::default()).is_err());
}

#[test]
fn test_append_updates_container_meta() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("meta.nc");
    let mut full = testdata::two_1d_traces(6)?;
    let mut first = first_records(&full, 3);
    first.add_meta("info", "first run");
    first.add_meta("operator", "alice");
    datadict_to_netcdf(&first, &path, AppendMode::None)?;
    let created = datadict_from_netcdf(&path, &LoadOptions::default())?.meta_val("creation_time_str")?.clone();

    full.add_meta("info", "second run");
    full.add_meta("averages", 20);
    datadict_to_netcdf(&full, &path, AppendMode::New)?;
    let loaded = datadict_from_netcdf(&path, &LoadOptions::default())?;
    assert_eq!(loaded.nrecords(), 6);
    assert_eq!(loaded.meta_val("info")?, &serde_json::json!("second run"));
    assert_eq!(loaded.meta_val("averages")?, &serde_json::json!(20));
    assert_eq!(loaded.meta_val("operator")?, &serde_json::json!("alice"));
    assert_eq!(loaded.meta_val("creation_time_str")?, &created);
    Ok(())
}

#[test]
fn test_named_groups() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("groups.nc");
    let traces = testdata::two_1d_traces(5)?;
    let sweep = testdata::three_compatible_3d_sets(2, 3, 4, 1.0)?;

    datadict_to_netcdf(&traces, &path, AppendMode::None)?;
    datadict_to_netcdf_group(&sweep, &path, "sweep", AppendMode::None)?;
    assert_eq!(group_names(&path)?, vec!["data", "sweep"]);

    let all = all_datadicts_from_netcdf(&path, &LoadOptions::default())?;
    assert_eq!(all.len(), 2);
    assert_same_values(&all["data"], &traces)?;
    assert_same_values(&all["sweep"], &sweep)?;

    // appending to one group leaves the other alone
    datadict_to_netcdf_group(&sweep, &path, "sweep", AppendMode::All)?;
    assert_eq!(datadict_from_netcdf_group(&path, "sweep", &LoadOptions::default())?.nrecords(), 48);
    assert_same_values(&datadict_from_netcdf(&path, &LoadOptions::default())?, &traces)?;

    // overwriting a group keeps the others
    datadict_to_netcdf(&first_records(&traces, 2), &path, AppendMode::None)?;
    assert_eq!(datadict_from_netcdf(&path, &LoadOptions::default())?.nrecords(), 2);
    assert_eq!(datadict_from_netcdf_group(&path, "sweep", &LoadOptions::default())?.nrecords(), 48);

    assert!(matches!(
        datadict_from_netcdf_group(&path, "missing", &LoadOptions::default()),
        Err(DataDictError::GroupNotFound { .. })
    ));
    assert!(datadict_to_netcdf_group(&traces, &path, "a/b", AppendMode::None).is_err());
    assert!(datadict_to_netcdf_group(&traces, &path, "", AppendMode::None).is_err());
    Ok(())
}

#[test]
fn test_unequal_record_counts() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("unequal.nc");
    {
        let mut file = netcdf::create(&path)?;
        let mut group = file.add_group("data")?;
        group.add_dimension("a", 5)?;
        group.add_dimension("b", 3)?;
        let mut x = group.add_variable::<f64>("x", &["a"])?;
        x.put_values(&[0.0, 1.0, 2.0, 3.0, 4.0], ..)?;
        let mut y = group.add_variable::<f64>("y", &["b"])?;
        y.put_attribute("axes", vec!["x".to_string()])?;
        y.put_values(&[10.0, 11.0, 12.0], ..)?;
    }

    let truncated = datadict_from_netcdf(&path, &LoadOptions::default())?;
    assert_eq!(truncated.nrecords(), 3);
    assert_eq!(truncated.data_vals("x")?, &ndarray::arr1(&[0.0, 1.0, 2.0]).into_dyn());
    assert_eq!(truncated.field("y")?.axes, vec!["x"]);

    let strict = LoadOptions {
        ignore_unequal_lengths: false,
        ..LoadOptions::default()
    };
    assert!(matches!(
        datadict_from_netcdf(&path, &strict),
        Err(DataDictError::InvalidShape { .. })
    ));
    Ok(())
}
