//! Synthetic datasets for tests and demos
//!
//! Noise is deterministic so that generated data is reproducible.

use crate::base::DataContainer;
use crate::datadict::DataDict;
use crate::errors::Result;
use crate::field::DataField;
use crate::meshgrid::MeshgridDataDict;
use ndarray::{Array1, ArrayD, IxDyn};

/// Pseudo-random value in `[0, 1)` for index `i`
fn noise(i: usize, seed: f64) -> f64 {
    ((i as f64 * 12.9898 + seed * 78.233).sin() * 43_758.545_3).fract().abs()
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    Array1::linspace(start, end, n).to_vec()
}

fn arange(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

/// Flattened `ij`-indexed meshgrid of the given axis values
fn flat_meshgrid(axes: &[&[f64]]) -> Vec<Vec<f64>> {
    let total: usize = axes.iter().map(|a| a.len()).product();
    let mut out = vec![Vec::with_capacity(total); axes.len()];
    for idx in 0..total {
        let mut rest = idx;
        for (k, ax) in axes.iter().enumerate().rev() {
            out[k].push(ax[rest % ax.len()]);
            rest /= ax.len();
        }
    }
    out
}

/// `x` with two dependents `y = cos(x)` and `z = cos(x)^2`
pub fn two_1d_traces(nvals: usize) -> Result<DataDict> {
    let x = linspace(0.0, 10.0, nvals);
    let y: Vec<f64> = x.iter().map(|v| v.cos()).collect();
    let z: Vec<f64> = x.iter().map(|v| v.cos().powi(2)).collect();
    let d = DataDict::new()
        .with_field("x", DataField::from_vec(x))
        .with_field("y", DataField::from_vec(y).with_axes(&["x"]))
        .with_field("z", DataField::from_vec(z).with_axes(&["x"]));
    d.validate()?;
    Ok(d)
}

/// A noisy cosine on an `nx` x `ny` grid, `y` swept fastest
pub fn one_2d_set(nx: usize, ny: usize) -> Result<DataDict> {
    let (x, y) = (linspace(0.0, 10.0, nx), arange(ny));
    let grid = flat_meshgrid(&[&x, &y]);
    let cos: Vec<f64> = grid[0]
        .iter()
        .enumerate()
        .map(|(i, v)| v.cos() - 0.05 + 0.1 * noise(i, 1.0))
        .collect();
    let d = DataDict::new()
        .with_field("x", DataField::from_vec(grid[0].clone()))
        .with_field("y", DataField::from_vec(grid[1].clone()))
        .with_field("cos_data", DataField::from_vec(cos).with_axes(&["x", "y"]));
    d.validate()?;
    Ok(d)
}

/// Noisy cosine and sine sharing the axes `x`, `y`
pub fn two_compatible_noisy_2d_sets(nx: usize, ny: usize) -> Result<DataDict> {
    let mut d = one_2d_set(nx, ny)?;
    let sin: Vec<f64> = d
        .data_vals("x")?
        .iter()
        .enumerate()
        .map(|(i, v)| v.sin() - 0.5 + noise(i, 2.0))
        .collect();
    d.add_field("sin_data", DataField::from_vec(sin).with_axes(&["x", "y"]));
    d.validate()?;
    Ok(d)
}

fn axes_3d(nx: usize, ny: usize, nz: usize) -> Vec<Vec<f64>> {
    let (x, y, z) = (linspace(0.0, 10.0, nx), linspace(-5.0, 5.0, ny), arange(nz));
    flat_meshgrid(&[&x, &y, &z])
}

fn with_3d_axes(grid: &[Vec<f64>]) -> DataDict {
    DataDict::new()
        .with_field("x", DataField::from_vec(grid[0].clone()).with_unit("mA"))
        .with_field("y", DataField::from_vec(grid[1].clone()).with_unit("uC"))
        .with_field("z", DataField::from_vec(grid[2].clone()).with_unit("nF"))
}

fn noisy<F: Fn(f64, f64) -> f64>(grid: &[Vec<f64>], f: F, rand_factor: f64, seed: f64) -> Vec<f64> {
    grid[0]
        .iter()
        .zip(&grid[1])
        .enumerate()
        .map(|(i, (&x, &y))| f(x, y) + rand_factor * noise(i, seed))
        .collect()
}

/// Three dependents on the same axes `x`, `y`, `z`
pub fn three_compatible_3d_sets(nx: usize, ny: usize, nz: usize, rand_factor: f64) -> Result<DataDict> {
    let grid = axes_3d(nx, ny, nz);
    let xyz = ["x", "y", "z"];
    let d = with_3d_axes(&grid)
        .with_field(
            "data",
            DataField::from_vec(noisy(&grid, |x, y| x.cos() * y.sin(), rand_factor, 1.0))
                .with_axes(&xyz)
                .with_unit("kW"),
        )
        .with_field(
            "more_data",
            DataField::from_vec(noisy(&grid, |x, y| x.sin() * y.cos(), rand_factor, 2.0))
                .with_axes(&xyz)
                .with_unit("MV"),
        )
        .with_field(
            "different_data",
            DataField::from_vec(noisy(&grid, |x, y| (x.cos() * y.cos()).powi(2), rand_factor, 3.0))
                .with_axes(&xyz)
                .with_unit("TS"),
        );
    d.validate()?;
    Ok(d)
}

/// Three dependents on the axes `x`, `y`, `z`, each listing them in a different order
pub fn three_incompatible_3d_sets(nx: usize, ny: usize, nz: usize, rand_factor: f64) -> Result<DataDict> {
    let grid = axes_3d(nx, ny, nz);
    let d = with_3d_axes(&grid)
        .with_field(
            "data",
            DataField::from_vec(noisy(&grid, |x, y| x.cos() * y.sin(), rand_factor, 1.0))
                .with_axes(&["x", "y", "z"])
                .with_unit("kW"),
        )
        .with_field(
            "more_data",
            DataField::from_vec(noisy(&grid, |x, y| x.sin() * y.cos(), rand_factor, 2.0))
                .with_axes(&["y", "x", "z"])
                .with_unit("MV"),
        )
        .with_field(
            "different_data",
            DataField::from_vec(noisy(&grid, |x, y| x.sin() * y.cos(), rand_factor, 3.0))
                .with_axes(&["z", "y", "x"])
                .with_unit("TS"),
        );
    d.validate()?;
    Ok(d)
}

/// Gridded `x * y * z` on an `nx` x `ny` x `nz` grid
pub fn meshgrid_3d(nx: usize, ny: usize, nz: usize) -> Result<MeshgridDataDict> {
    let (x, y, z) = (arange(nx), linspace(-1.0, 1.0, ny), linspace(0.0, 1.0, nz));
    let grid = flat_meshgrid(&[&x, &y, &z]);
    let shape = IxDyn(&[nx, ny, nz]);
    let vals: Vec<f64> = (0..grid[0].len())
        .map(|i| grid[0][i] * grid[1][i] * grid[2][i])
        .collect();

    let d = MeshgridDataDict::new()
        .with_field("x", DataField::new(ArrayD::from_shape_vec(shape.clone(), grid[0].clone())?))
        .with_field("y", DataField::new(ArrayD::from_shape_vec(shape.clone(), grid[1].clone())?))
        .with_field("z", DataField::new(ArrayD::from_shape_vec(shape.clone(), grid[2].clone())?))
        .with_field(
            "vals",
            DataField::new(ArrayD::from_shape_vec(shape, vals)?).with_axes(&["x", "y", "z"]),
        );
    d.validate()?;
    Ok(d)
}
