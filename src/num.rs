//! Numerical tools for working with measurement arrays
//!
//! Invalid entries are NaN throughout. The grid inference here works on
//! flattened axis values as recorded by a sweep: the fastest axis reverses
//! direction most often, the slowest axis never does.

use crate::errors::{DataDictError, Result};
use ndarray::{s, Array2, ArrayD, Axis, Ix1, Ix2, IxDyn};

/// Element-wise invalid mask
pub fn is_invalid(a: &ArrayD<f64>) -> ArrayD<bool> {
    a.mapv(f64::is_nan)
}

/// Check if two arrays are equal, content-wise.
///
/// Elements compare equal if they are identical, close within `rtol` (with
/// an absolute tolerance of 1e-8), or both invalid. Arrays of different
/// shape are never equal.
pub fn arrays_equal(a: &ArrayD<f64>, b: &ArrayD<f64>, rtol: f64) -> bool {
    if a.shape() != b.shape() {
        return false;
    }
    const ATOL: f64 = 1e-8;
    a.iter().zip(b.iter()).all(|(&x, &y)| {
        x == y || (x - y).abs() <= ATOL + rtol * y.abs() || (x.is_nan() && y.is_nan())
    })
}

/// Reshape an array to a target shape.
///
/// The input is flattened first. If the target is larger, the end is padded
/// with NaN; if it is smaller, the end is cut off.
pub fn array1d_to_meshgrid(arr: &ArrayD<f64>, target_shape: &[usize]) -> Result<ArrayD<f64>> {
    let newsize: usize = target_shape.iter().product();
    let mut flat: Vec<f64> = arr.iter().copied().take(newsize).collect();
    flat.resize(newsize, f64::NAN);
    Ok(ArrayD::from_shape_vec(IxDyn(target_shape), flat)?)
}

/// Number of records after which the sweep direction of an axis repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// The values never reverse direction
    Infinite,
    Finite(usize),
}

/// Linear-interpolation percentile of already sorted values
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Indices (into the deltas) at which the sweep jumps back
fn find_switches(arr: &[f64]) -> Vec<usize> {
    const RTH: f64 = 25.0;
    const ZTOL: f64 = 1e-15;

    let mut valid: Vec<f64> = arr.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.len() < 2 {
        return Vec::new();
    }
    valid.sort_by(f64::total_cmp);
    let diff = (percentile(&valid, 100.0 - RTH) - percentile(&valid, RTH)).abs();
    if !(diff > ZTOL) {
        return Vec::new();
    }

    // NaN where either neighbour is invalid
    let deltas: Vec<f64> = arr.windows(2).map(|w| w[1] - w[0]).collect();

    // large jumps are switch candidates
    let candidates: Vec<usize> = deltas
        .iter()
        .enumerate()
        .filter(|(i, d)| *i > 0 && d.abs() >= diff)
        .map(|(i, _)| i)
        .collect();
    let Some(&first) = candidates.first() else {
        return Vec::new();
    };

    // real switches go against the sweep direction seen before the first one
    let before: Vec<f64> = deltas[..first].iter().copied().filter(|d| !d.is_nan()).collect();
    let mean = before.iter().sum::<f64>() / before.len().max(1) as f64;
    let direction = sign(mean);

    candidates
        .into_iter()
        .filter(|&i| sign(deltas[i]) == -direction)
        .collect()
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Find the period with which the values in a 1-d array change direction.
///
/// With `ignore_last`, a shorter final period (incomplete data) does not
/// count against uniqueness. Returns `None` if no unique period exists.
pub fn find_direction_period(vals: &[f64], ignore_last: bool) -> Option<Period> {
    let mut switches = find_switches(vals);
    let size = vals.len();

    match switches.len() {
        0 => return Some(Period::Infinite),
        // a single switch only defines a period in the second half of the data
        1 => {
            return if switches[0] as f64 >= size as f64 / 2.0 - 1.0 {
                Some(Period::Finite(switches[0] + 1))
            } else {
                None
            };
        }
        _ => {}
    }

    if switches[switches.len() - 1] < size - 1 {
        switches.push(size - 1);
    }
    let mut periods: Vec<usize> = switches.windows(2).map(|w| w[1] - w[0]).collect();
    if ignore_last && periods.len() > 1 && periods[periods.len() - 1] < periods[0] {
        periods.pop();
    }

    match periods.first() {
        None => Some(Period::Finite(size)),
        Some(&p) if periods.iter().all(|&q| q == p) => Some(Period::Finite(p)),
        Some(_) => None,
    }
}

/// Infer order and shape of a set of flattened axes.
///
/// Looks at how often each axis reverses its sweep direction. Returns the
/// axis names ordered slowest to fastest and the matching grid shape, or
/// `None` if no consistent grid explains the data. Incomplete grids (the
/// last sweeps missing) are supported.
///
/// # Errors
///
/// Returns an error for empty input, non-1-d arrays, or arrays of unequal size.
pub fn guess_grid_from_sweep_direction(axes: &[(&str, &ArrayD<f64>)]) -> Result<Option<(Vec<String>, Vec<usize>)>> {
    if axes.is_empty() {
        return Err(DataDictError::invalid_input("Empty input."));
    }

    let mut size: Option<usize> = None;
    let mut entries: Vec<(String, Period, f64)> = Vec::new();

    for &(name, vals) in axes {
        if vals.ndim() != 1 {
            return Err(DataDictError::InvalidShape {
                message: format!("Expect 1-dimensional axis data, not {:?}", vals.shape()),
            });
        }
        match size {
            None => size = Some(vals.len()),
            Some(s) if s != vals.len() => {
                return Err(DataDictError::invalid_input("Non-matching array sizes."));
            }
            Some(_) => {}
        }
        let n = vals.len();
        let flat: Vec<f64> = vals.iter().copied().collect();

        let Some(period) = find_direction_period(&flat, true) else {
            return Ok(None);
        };

        // axes without repetition yet: more diverse values suggest a faster axis
        let sorting = match period {
            Period::Finite(p) => p as f64,
            Period::Infinite => {
                let valid: Vec<f64> = flat.iter().copied().filter(|v| !v.is_nan()).collect();
                let count = valid.len().max(1) as f64;
                let mut mean = valid.iter().sum::<f64>() / count;
                let std = (valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count).sqrt();
                let cost = if std == 0.0 {
                    f64::INFINITY
                } else {
                    if mean == 0.0 {
                        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
                        mean = max.abs().max(min.abs());
                    }
                    1.0 / (std / mean).abs()
                };
                n as f64 + cost
            }
        };
        entries.push((name.to_string(), period, sorting));
    }

    let size = size.unwrap_or(0);

    // fastest to slowest
    entries.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut shape = Vec::with_capacity(entries.len());
    let mut divisor: usize = 1;
    for (_, period, _) in &entries {
        let len = match period {
            Period::Infinite => {
                if size % divisor > 0 {
                    size / divisor + 1
                } else {
                    size / divisor
                }
            }
            Period::Finite(p) => p / divisor,
        };
        if len == 0 {
            return Ok(None);
        }
        divisor *= len;
        shape.push(len);
    }

    // the full grid may exceed the data size (incomplete grid), never the reverse
    if divisor < size {
        return Ok(None);
    }

    let names: Vec<String> = entries.into_iter().rev().map(|(n, _, _)| n).collect();
    shape.reverse();
    Ok(Some((names, shape)))
}

fn as_2d(arr: &ArrayD<f64>) -> Result<ndarray::ArrayView2<'_, f64>> {
    if arr.ndim() != 2 {
        return Err(DataDictError::InvalidShape {
            message: format!("input is not a 2d array (shape {:?}).", arr.shape()),
        });
    }
    Ok(arr.view().into_dimensionality::<Ix2>()?)
}

/// Row and column indices of a 2-d array that contain only invalid entries.
pub fn crop2d_rows_cols(arr: &ArrayD<f64>) -> Result<(Vec<usize>, Vec<usize>)> {
    let a = as_2d(arr)?;
    let xs = (0..a.nrows())
        .filter(|&i| a.row(i).iter().all(|v| v.is_nan()))
        .collect();
    let ys = (0..a.ncols())
        .filter(|&j| a.column(j).iter().all(|v| v.is_nan()))
        .collect();
    Ok((xs, ys))
}

/// Invalid rows/cols of any of the input arrays, joined and sorted.
pub fn joint_crop2d_rows_cols(arrs: &[&ArrayD<f64>]) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for a in arrs {
        let (x, y) = crop2d_rows_cols(a)?;
        xs.extend(x);
        ys.extend(y);
    }
    xs.sort_unstable();
    xs.dedup();
    ys.sort_unstable();
    ys.dedup();
    Ok((xs, ys))
}

/// Remove the given rows (`xs`) and columns (`ys`) from a 2-d array.
pub fn crop2d_from_xy(arr: &ArrayD<f64>, xs: &[usize], ys: &[usize]) -> Result<ArrayD<f64>> {
    let a = as_2d(arr)?;
    let rows: Vec<usize> = (0..a.nrows()).filter(|i| !xs.contains(i)).collect();
    let cols: Vec<usize> = (0..a.ncols()).filter(|j| !ys.contains(j)).collect();
    Ok(a.select(Axis(0), &rows).select(Axis(1), &cols).into_dyn())
}

/// Remove invalid rows and columns from 2-d data.
///
/// Invalid areas are determined from the `x` and `y` coordinates; the same
/// rows and columns are cropped from all arrays. Returns `x`, `y`, then the
/// others, in order.
pub fn crop2d(x: &ArrayD<f64>, y: &ArrayD<f64>, others: &[&ArrayD<f64>]) -> Result<Vec<ArrayD<f64>>> {
    let (xs, ys) = joint_crop2d_rows_cols(&[x, y])?;
    std::iter::once(x)
        .chain(std::iter::once(y))
        .chain(others.iter().copied())
        .map(|a| crop2d_from_xy(a, &xs, &ys))
        .collect()
}

/// Fill missing values of a 1-d lane by linear interpolation.
///
/// Leading invalid values stay invalid; trailing ones take the last valid value.
fn interpolate_lane(lane: &mut [f64]) {
    let valid: Vec<usize> = (0..lane.len()).filter(|&i| !lane[i].is_nan()).collect();
    let Some(&last) = valid.last() else {
        return;
    };
    for pair in valid.windows(2) {
        let (i0, i1) = (pair[0], pair[1]);
        let (v0, v1) = (lane[i0], lane[i1]);
        for i in i0 + 1..i1 {
            lane[i] = v0 + (v1 - v0) * (i - i0) as f64 / (i1 - i0) as f64;
        }
    }
    let fill = lane[last];
    for v in lane.iter_mut().skip(last + 1) {
        *v = fill;
    }
}

/// Try to find missing vertices in a 2-d meshgrid.
///
/// `xx` is interpolated along its rows and `yy` along its columns, e.g.
/// `xx = [[0, 0], [1, nan]]`, `yy = [[0, 1], [0, nan]]` become
/// `[[0, 0], [1, 1]]` and `[[0, 1], [0, 1]]`.
pub fn interp_meshgrid_2d(xx: &ArrayD<f64>, yy: &ArrayD<f64>) -> Result<(ArrayD<f64>, ArrayD<f64>)> {
    let mut xx2 = as_2d(xx)?.to_owned();
    let mut yy2 = as_2d(yy)?.to_owned();
    fill_lanes(&mut xx2, Axis(1));
    fill_lanes(&mut yy2, Axis(0));
    Ok((xx2.into_dyn(), yy2.into_dyn()))
}

fn fill_lanes(a: &mut Array2<f64>, axis: Axis) {
    for mut lane in a.lanes_mut(axis) {
        let mut buf: Vec<f64> = lane.iter().copied().collect();
        interpolate_lane(&mut buf);
        for (dst, src) in lane.iter_mut().zip(buf) {
            *dst = src;
        }
    }
}

/// Bounding vertices of a 1-d mesh given by its center coordinates.
///
/// ```text
/// o-x-o-x-o-x-o-x--o--x--o
/// ```
pub fn centers2edges_1d(arr: &ArrayD<f64>) -> Result<ArrayD<f64>> {
    let c = arr.view().into_dimensionality::<Ix1>()?;
    let n = c.len();
    if n < 2 {
        return Err(DataDictError::InvalidShape {
            message: "need at least 2 centers".to_string(),
        });
    }
    let mut e = Vec::with_capacity(n + 1);
    let mids: Vec<f64> = (0..n - 1).map(|i| (c[i] + c[i + 1]) / 2.0).collect();
    e.push(c[0] - (mids[0] - c[0]));
    e.extend_from_slice(&mids);
    e.push(c[n - 1] + (c[n - 1] - mids[mids.len() - 1]));
    Ok(ndarray::Array1::from_vec(e).into_dyn())
}

/// Bounding vertices of a 2-d mesh given by its center coordinates.
///
/// ```text
/// o   o   o   o
///   x---x---x
/// o | o | o | o
///   x---x---x
/// o   o   o   o
/// ```
pub fn centers2edges_2d(centers: &ArrayD<f64>) -> Result<ArrayD<f64>> {
    let c = as_2d(centers)?;
    let (n0, n1) = c.dim();
    if n0 < 2 || n1 < 2 {
        return Err(DataDictError::InvalidShape {
            message: format!("need at least 2x2 centers, got {n0}x{n1}"),
        });
    }
    let mut edges = Array2::<f64>::zeros((n0 + 1, n1 + 1));

    // inner vertices: mean of the four neighbouring centers
    let center = (&c.slice(s![1.., 1..]) + &c.slice(s![..-1, ..-1]) + &c.slice(s![..-1, 1..])
        + &c.slice(s![1.., ..-1]))
        / 4.0;
    edges.slice_mut(s![1..-1, 1..-1]).assign(&center);

    // outer edges: twice the mean of neighbouring centers, minus the inner vertex
    let left = (&c.slice(s![0, 1..]) + &c.slice(s![0, ..-1])) - &center.slice(s![0, ..]);
    edges.slice_mut(s![0, 1..-1]).assign(&left);
    let right = (&c.slice(s![-1, 1..]) + &c.slice(s![-1, ..-1])) - &center.slice(s![-1, ..]);
    edges.slice_mut(s![-1, 1..-1]).assign(&right);
    let top = (&c.slice(s![1.., 0]) + &c.slice(s![..-1, 0])) - &center.slice(s![.., 0]);
    edges.slice_mut(s![1..-1, 0]).assign(&top);
    let bottom = (&c.slice(s![1.., -1]) + &c.slice(s![..-1, -1])) - &center.slice(s![.., -1]);
    edges.slice_mut(s![1..-1, -1]).assign(&bottom);

    // corners: mirror the nearest inner vertex at the corner center
    edges[[0, 0]] = 2.0 * c[[0, 0]] - edges[[1, 1]];
    edges[[0, n1]] = 2.0 * c[[0, n1 - 1]] - edges[[1, n1 - 1]];
    edges[[n0, 0]] = 2.0 * c[[n0 - 1, 0]] - edges[[n0 - 1, 1]];
    edges[[n0, n1]] = 2.0 * c[[n0 - 1, n1 - 1]] - edges[[n0 - 1, n1 - 1]];

    Ok(edges.into_dyn())
}
