use datadict::config::PipelineConfig;
use datadict::prelude::*;
use datadict::testdata;
use tempfile::tempdir;

#[test]
fn test_load_process_save_integration() {
    // Create a temporary NetCDF file for testing
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input_path = temp_dir.path().join("measurement.nc");
    let output_path = temp_dir.path().join("reduced.nc");

    // 3 x 4 x 5 sweep with three dependents
    let data = testdata::three_compatible_3d_sets(3, 4, 5, 0.5).expect("Failed to create test data");
    datadict_to_netcdf(&data, &input_path, AppendMode::None).expect("Failed to write input file");

    let loaded = datadict_from_netcdf(&input_path, &LoadOptions::default()).expect("Failed to load input file");
    assert_eq!(loaded.nrecords(), 60);
    assert_eq!(loaded.dependents(), vec!["data", "more_data", "different_data"]);

    // Select one dependent, grid it and average over z
    let pipeline = PipelineConfig::from_json_str(
        r#"{"nodes": [
            {"type": "select", "names": ["more_data"]},
            {"type": "grid"},
            {"type": "reduce", "reductions": {"z": "average"}}
        ]}"#,
    )
    .expect("Failed to parse pipeline");
    let flowchart = pipeline.to_flowchart().expect("Failed to build flowchart");
    let result = flowchart
        .run(NodeData::Tabular(loaded))
        .expect("Pipeline failed")
        .expect("Pipeline produced no output");

    let grid = result.as_meshgrid().expect("Expected gridded output");
    assert_eq!(grid.shape(), Some(vec![3, 4]));
    assert_eq!(grid.field("more_data").expect("missing field").axes, vec!["x", "y"]);

    // Expected averages, computed directly from the tabular input:
    // records are ordered x (slowest), y, z (fastest)
    let values = data.data_vals("more_data").expect("missing field");
    let averaged = grid.data_vals("more_data").expect("missing field");
    for i in 0..3 {
        for j in 0..4 {
            let start = (i * 4 + j) * 5;
            let expected = (start..start + 5).map(|k| values[[k]]).sum::<f64>() / 5.0;
            assert!((averaged[[i, j]] - expected).abs() < 1e-12);
        }
    }

    // Save the flattened result and read it back
    let flat = meshgrid_to_datadict(grid).expect("Failed to flatten result");
    datadict_to_netcdf(&flat, &output_path, AppendMode::None).expect("Failed to write output file");
    let reloaded = datadict_from_netcdf(&output_path, &LoadOptions::default()).expect("Failed to load output file");
    assert_eq!(reloaded.nrecords(), 12);
    assert_eq!(reloaded.field_names(), vec!["x", "y", "more_data"]);
    assert_eq!(reloaded.field("more_data").expect("missing field").unit, "MV");
}
