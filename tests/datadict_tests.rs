//! Tests for the base container and tabular data

use datadict::prelude::*;
use datadict::{same_structure, testdata};
use ndarray::{arr2, Array1, ArrayD, IxDyn};
use serde_json::json;

fn v(vals: &[f64]) -> ArrayD<f64> {
    Array1::from_vec(vals.to_vec()).into_dyn()
}

fn simple() -> DataDict {
    DataDict::new()
        .with_field("x", DataField::from_vec(vec![1.0, 2.0, 3.0]).with_unit("V"))
        .with_field("y", DataField::from_vec(vec![1.0, 4.0, 9.0]).with_axes(&["x"]).with_unit("A"))
}

#[test]
fn test_structure_queries() -> Result<()> {
    let dd = testdata::three_compatible_3d_sets(2, 3, 4, 1.0)?;
    assert_eq!(dd.axes(), vec!["x", "y", "z"]);
    assert_eq!(dd.dependents(), vec!["data", "more_data", "different_data"]);
    assert_eq!(dd.axes_of(&["data"])?, vec!["x", "y", "z"]);
    assert!(dd.axes_of(&["nope"]).is_err());
    assert!(dd.compatible_axes());
    assert_eq!(dd.nrecords(), 24);
    assert_eq!(dd.shapes()["data"], vec![24]);
    assert_eq!(dd.nbytes(), 6 * 24 * 8);
    assert_eq!(dd.label("data")?, "data (kW)");

    let plain = testdata::two_1d_traces(11)?;
    assert_eq!(plain.label("x")?, "x");

    let incompatible = testdata::three_incompatible_3d_sets(2, 3, 4, 1.0)?;
    assert!(!incompatible.compatible_axes());
    assert_eq!(incompatible.axes(), vec!["x", "y", "z"]);
    Ok(())
}

#[test]
fn test_meta_data() -> Result<()> {
    let mut dd = simple();
    dd.add_meta("info", "some info");
    dd.add_meta("count", 3);
    dd.add_field_meta("y", "careful", true)?;

    assert_eq!(dd.meta_val("info")?, &json!("some info"));
    assert_eq!(dd.field_meta_val("y", "careful")?, &json!(true));
    let keys: Vec<&String> = dd.meta_items().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["info", "count"]);

    assert_eq!(dd.delete_meta("count")?, json!(3));
    assert!(matches!(
        dd.meta_val("count"),
        Err(DataDictError::MetaNotFound { field: None, .. })
    ));
    assert!(matches!(
        dd.field_meta_val("x", "careful"),
        Err(DataDictError::MetaNotFound { field: Some(_), .. })
    ));
    assert!(dd.add_field_meta("nope", "a", 1).is_err());

    dd.clear_meta(Some("y"))?;
    assert!(dd.field_meta("y")?.is_empty());
    assert_eq!(dd.meta().len(), 1);

    dd.add_field_meta("x", "a", 1)?;
    dd.clear_meta(None)?;
    assert!(dd.meta().is_empty());
    assert!(dd.field_meta("x")?.is_empty());
    Ok(())
}

#[test]
fn test_validation_collects_all_problems() {
    let dd = DataDict::new()
        .with_field("x", DataField::from_vec(vec![1.0, 2.0, 3.0]))
        .with_field("y", DataField::from_vec(vec![1.0, 2.0]).with_axes(&["x"]))
        .with_field("z", DataField::from_vec(vec![1.0, 2.0, 3.0]).with_axes(&["q"]));

    match dd.validate() {
        Err(DataDictError::Validation(problems)) => {
            assert_eq!(problems.len(), 2);
            assert!(problems.iter().any(|p| p.contains("'q'")));
            assert!(problems.iter().any(|p| p.contains("length 2")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_dependency_graph_is_two_layers() {
    let dd = simple().with_field("z", DataField::from_vec(vec![0.0; 3]).with_axes(&["y"]));
    assert!(matches!(dd.validate(), Err(DataDictError::Validation(_))));

    let dd = simple().with_field("z", DataField::from_vec(vec![0.0; 3]).with_axes(&["x", "x"]));
    assert!(dd.validate().is_err());
}

#[test]
fn test_zero_dimensional_values_rejected() {
    let dd = simple().with_field("s", DataField::new(ArrayD::from_elem(IxDyn(&[]), 1.0)));
    assert!(dd.validate().is_err());
}

#[test]
fn test_append_and_concat() -> Result<()> {
    let mut a = simple();
    let b = DataDict::new()
        .with_field("x", DataField::from_vec(vec![4.0, 5.0]).with_unit("V"))
        .with_field("y", DataField::from_vec(vec![16.0, 25.0]).with_axes(&["x"]).with_unit("A"));

    let c = a.concat(&b)?;
    assert_eq!(c.nrecords(), 5);
    assert_eq!(a.nrecords(), 3);

    a.append(&b)?;
    assert_eq!(a, c);
    assert_eq!(a.data_vals("y")?, &v(&[1.0, 4.0, 9.0, 16.0, 25.0]));

    let other_unit = DataDict::new()
        .with_field("x", DataField::from_vec(vec![4.0]).with_unit("mV"))
        .with_field("y", DataField::from_vec(vec![16.0]).with_axes(&["x"]).with_unit("A"));
    assert!(matches!(
        a.append(&other_unit),
        Err(DataDictError::IncompatibleStructure { .. })
    ));
    Ok(())
}

#[test]
fn test_add_data() -> Result<()> {
    let mut dd = simple();
    dd.add_data(&[("x", v(&[4.0])), ("y", v(&[16.0]))])?;
    assert_eq!(dd.nrecords(), 4);
    assert_eq!(dd.data_vals("x")?, &v(&[1.0, 2.0, 3.0, 4.0]));

    assert!(dd.add_data(&[("x", v(&[5.0]))]).is_err());
    assert!(dd.add_data(&[("x", v(&[5.0, 6.0])), ("y", v(&[1.0]))]).is_err());
    assert_eq!(dd.nrecords(), 4);

    // starting from an empty structure
    let mut empty = simple().structure(false, false)?;
    assert_eq!(empty.nrecords(), 0);
    empty.add_data(&[("x", v(&[1.0, 2.0])), ("y", v(&[3.0, 4.0]))])?;
    assert_eq!(empty.nrecords(), 2);
    assert_eq!(empty.field("x")?.unit, "V");
    Ok(())
}

#[test]
fn test_structure_copies() -> Result<()> {
    let mut dd = simple();
    dd.add_meta("info", "x");
    let s = dd.structure(true, false)?;
    assert_eq!(s.data_vals("y")?.len(), 0);
    assert_eq!(s.field_meta_val("y", "shape")?, &json!([3]));
    assert!(s.meta_val("info").is_err());
    assert!(same_structure(&[&dd, &s], false));
    assert!(!same_structure(&[&dd, &s], true));

    let with_meta = dd.structure(false, true)?;
    assert_eq!(with_meta.meta_val("info")?, &json!("x"));
    Ok(())
}

#[test]
fn test_remove_invalid_entries() -> Result<()> {
    let nan = f64::NAN;
    let mut dd = DataDict::new()
        .with_field("x", DataField::from_vec(vec![1.0, 2.0, 3.0, 4.0]))
        .with_field("y", DataField::from_vec(vec![1.0, nan, 3.0, nan]).with_axes(&["x"]))
        .with_field("z", DataField::from_vec(vec![1.0, nan, nan, 4.0]).with_axes(&["x"]));
    dd.remove_invalid_entries()?;
    assert_eq!(dd.nrecords(), 3);
    assert_eq!(dd.data_vals("x")?, &v(&[1.0, 3.0, 4.0]));
    assert!(dd.data_vals("y")?[[2]].is_nan());

    // nested records count as invalid only if entirely invalid
    let mut nested = DataDict::new()
        .with_field("x", DataField::from_vec(vec![1.0, 2.0, 3.0]))
        .with_field(
            "z",
            DataField::new(arr2(&[[1.0, nan], [nan, nan], [nan, 2.0]]).into_dyn()).with_axes(&["x"]),
        );
    nested.remove_invalid_entries()?;
    assert_eq!(nested.nrecords(), 2);
    assert_eq!(nested.data_vals("x")?, &v(&[1.0, 3.0]));
    Ok(())
}

#[test]
fn test_sanitize_removes_unused_axes() -> Result<()> {
    let mut dd = simple().with_field("w", DataField::from_vec(vec![0.0; 3]));
    dd.sanitize()?;
    assert!(!dd.contains("w"));
    assert_eq!(dd.field_names(), vec!["x", "y"]);

    // containers without dependents keep their fields
    let mut axes_only = DataDict::new().with_field("x", DataField::from_vec(vec![1.0]));
    axes_only.sanitize()?;
    assert!(axes_only.contains("x"));
    Ok(())
}

#[test]
fn test_extract() -> Result<()> {
    let mut dd = testdata::three_compatible_3d_sets(2, 2, 2, 1.0)?;
    dd.add_meta("info", "keep me");
    let ex = dd.extract(&["more_data"], true, true)?;
    assert_eq!(ex.field_names(), vec!["x", "y", "z", "more_data"]);
    assert_eq!(ex.meta_val("info")?, &json!("keep me"));

    let bare = dd.extract(&["data"], false, false)?;
    assert!(bare.meta().is_empty());
    assert!(dd.extract(&["missing"], false, false).is_err());
    Ok(())
}

#[test]
fn test_reorder_axes() -> Result<()> {
    let mut dd = testdata::three_compatible_3d_sets(2, 2, 2, 1.0)?;
    let (perm, order) = dd.new_order("data", &[("z", 0)])?;
    assert_eq!(perm, vec![2, 0, 1]);
    assert_eq!(order, vec!["z", "x", "y"]);

    dd.reorder_axes(Some(&["data"][..]), &[("z", 0)])?;
    assert_eq!(dd.field("data")?.axes, vec!["z", "x", "y"]);
    assert_eq!(dd.field("more_data")?.axes, vec!["x", "y", "z"]);

    dd.reorder_axes(None, &[("y", 2)])?;
    assert_eq!(dd.field("more_data")?.axes, vec!["x", "z", "y"]);

    assert!(matches!(
        dd.new_order("data", &[("x", 0), ("y", 0)]),
        Err(DataDictError::InvalidOrder { .. })
    ));
    assert!(dd.new_order("data", &[("x", 3)]).is_err());
    assert!(dd.new_order("data", &[("w", 0)]).is_err());
    Ok(())
}

#[test]
fn test_expand_nested_records() -> Result<()> {
    let dd = DataDict::new()
        .with_field("x", DataField::from_vec(vec![1.0, 2.0]))
        .with_field(
            "z",
            DataField::new(arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn()).with_axes(&["x"]),
        );
    assert!(!dd.is_expanded());
    let ex = dd.expand()?;
    assert!(ex.is_expanded());
    assert_eq!(ex.data_vals("x")?, &v(&[1.0, 1.0, 1.0, 2.0, 2.0, 2.0]));
    assert_eq!(ex.data_vals("z")?, &v(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    Ok(())
}

#[test]
fn test_basic_statistics() -> Result<()> {
    let mut dd = DataDict::new()
        .with_field("x", DataField::from_vec(vec![0.0, 1.0, 2.0]))
        .with_field("z", DataField::from_vec(vec![0.0, 1.0, 4.0]).with_axes(&["x"]));

    assert!((dd.avg("z").unwrap() - 5.0 / 3.0).abs() < 1e-12);
    assert!((dd.std("z").unwrap() - (26.0_f64 / 9.0).sqrt()).abs() < 1e-12);
    assert_eq!(dd.med("z"), Some(1.0));
    assert_eq!(dd.avg("missing"), None);

    dd.add_data(&[("x", v(&[3.0])), ("z", v(&[7.0]))])?;
    assert_eq!(dd.med("z"), Some(2.5));

    dd.normalize("z")?;
    assert_eq!(dd.data_vals("z")?, &v(&[0.0, 1.0 / 7.0, 4.0 / 7.0, 1.0]));

    let mut constant = DataDict::new().with_field("c", DataField::from_vec(vec![2.0, 2.0]));
    assert!(constant.normalize("c").is_err());
    Ok(())
}
