//! Axis reductions and NaN-aware summary statistics
//!
//! Reductions collapse one array dimension. They skip invalid (NaN or
//! infinite) values; a lane without a single valid value reduces to NaN.

use crate::errors::{DataDictError, Result};
use ndarray::{ArrayD, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Supported ways of removing an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionMethod {
    /// Keep only the element with the given index
    ElementSelection(usize),
    /// Arithmetic mean
    Average,
    /// Sum of values
    Sum,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
}

impl ReductionMethod {
    /// Get the string representation of the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ElementSelection(_) => "element selection",
            Self::Average => "average",
            Self::Sum => "sum",
            Self::Min => "minimum",
            Self::Max => "maximum",
        }
    }
}

impl std::str::FromStr for ReductionMethod {
    type Err = DataDictError;

    /// Parses `average` (or `mean`), `sum`, `min`, `max`, or an element index
    /// given as `N` or `index=N`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "average" | "mean" => Ok(Self::Average),
            "sum" => Ok(Self::Sum),
            "min" | "minimum" => Ok(Self::Min),
            "max" | "maximum" => Ok(Self::Max),
            other => other
                .strip_prefix("index=")
                .unwrap_or(other)
                .parse::<usize>()
                .map(Self::ElementSelection)
                .map_err(|_| DataDictError::invalid_input(format!("Unknown reduction method '{s}'"))),
        }
    }
}

/// Reduce `data` along `axis` with the given method
///
/// # Errors
///
/// Returns an error if the axis is out of bounds, or if the selected element
/// does not exist along that axis.
pub fn reduce_along_axis(data: &ArrayD<f64>, axis: usize, method: ReductionMethod) -> Result<ArrayD<f64>> {
    if axis >= data.ndim() {
        return Err(DataDictError::InvalidShape {
            message: format!(
                "Axis {axis} is out of bounds for array with {} dimensions",
                data.ndim()
            ),
        });
    }

    match method {
        ReductionMethod::ElementSelection(index) => select_element(data, axis, index),
        ReductionMethod::Average => parallel_mean_axis(data, axis),
        ReductionMethod::Sum => parallel_lane_reduce(data, axis, |lane| {
            let (sum, count) = lane_sum(lane);
            if count > 0 {
                sum
            } else {
                f64::NAN
            }
        }),
        ReductionMethod::Min => parallel_lane_reduce(data, axis, |lane| lane_extreme(lane, f64::min)),
        ReductionMethod::Max => parallel_lane_reduce(data, axis, |lane| lane_extreme(lane, f64::max)),
    }
}

fn select_element(data: &ArrayD<f64>, axis: usize, index: usize) -> Result<ArrayD<f64>> {
    let len = data.len_of(Axis(axis));
    if index >= len {
        return Err(DataDictError::InvalidShape {
            message: format!("Index {index} out of range for axis {axis} of length {len}"),
        });
    }
    Ok(data.index_axis(Axis(axis), index).to_owned())
}

/// Sum and count of the valid values in a lane
fn lane_sum(lane: ArrayView1<'_, f64>) -> (f64, usize) {
    lane.iter()
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0_usize), |(s, c), &v| (s + v, c + 1))
}

fn lane_extreme(lane: ArrayView1<'_, f64>, pick: fn(f64, f64) -> f64) -> f64 {
    lane.iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(pick)
        .unwrap_or(f64::NAN)
}

/// Applies `f` to every lane along `axis`, one output element per rayon task
fn parallel_lane_reduce<F>(data: &ArrayD<f64>, axis: usize, f: F) -> Result<ArrayD<f64>>
where
    F: Fn(ArrayView1<'_, f64>) -> f64 + Send + Sync,
{
    let mut new_shape = data.shape().to_vec();
    new_shape.remove(axis);

    // lanes iterate in the logical order of the remaining dimensions
    let lanes: Vec<_> = data.lanes(Axis(axis)).into_iter().collect();
    log::debug!(
        "Reducing {} lanes across {} threads",
        lanes.len(),
        rayon::current_num_threads()
    );

    let result: Vec<f64> = lanes.into_par_iter().map(f).collect();
    Ok(ArrayD::from_shape_vec(new_shape, result)?)
}

/// Computes the mean along an axis in parallel
///
/// # Errors
///
/// Returns an error if the result cannot be assembled into the reduced shape.
pub fn parallel_mean_axis(data: &ArrayD<f64>, axis: usize) -> Result<ArrayD<f64>> {
    parallel_lane_reduce(data, axis, |lane| {
        let (sum, count) = lane_sum(lane);
        if count > 0 {
            sum / count as f64
        } else {
            f64::NAN
        }
    })
}

fn valid_values<'a>(values: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
    values.into_iter().copied().filter(|v| v.is_finite()).collect()
}

/// Mean of all valid values, `None` if there are none
pub fn nan_mean(data: &ArrayD<f64>) -> Option<f64> {
    let valid = valid_values(data.iter());
    if valid.is_empty() {
        None
    } else {
        Some(valid.iter().sum::<f64>() / valid.len() as f64)
    }
}

/// Population standard deviation of all valid values
pub fn nan_std(data: &ArrayD<f64>) -> Option<f64> {
    let valid = valid_values(data.iter());
    let mean = nan_mean(data)?;
    let var = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / valid.len() as f64;
    Some(var.sqrt())
}

/// Median of all valid values
pub fn nan_median(data: &ArrayD<f64>) -> Option<f64> {
    let mut valid = valid_values(data.iter());
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(f64::total_cmp);
    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        Some((valid[mid - 1] + valid[mid]) / 2.0)
    } else {
        Some(valid[mid])
    }
}

/// Smallest and largest valid value
pub fn nan_min_max(data: &ArrayD<f64>) -> Option<(f64, f64)> {
    let valid = valid_values(data.iter());
    if valid.is_empty() {
        return None;
    }
    let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
    let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, IxDyn};

    #[test]
    fn mean_skips_invalid() {
        let a = arr2(&[[1.0, f64::NAN], [3.0, f64::NAN]]).into_dyn();
        let m = reduce_along_axis(&a, 0, ReductionMethod::Average).unwrap();
        assert_eq!(m[[0]], 2.0);
        assert!(m[[1]].is_nan());
    }

    #[test]
    fn min_max_sum() {
        let a = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 5.0, 3.0, 4.0, 2.0, 6.0]).unwrap();
        assert_eq!(
            reduce_along_axis(&a, 1, ReductionMethod::Min).unwrap().into_raw_vec(),
            vec![1.0, 2.0]
        );
        assert_eq!(
            reduce_along_axis(&a, 0, ReductionMethod::Max).unwrap().into_raw_vec(),
            vec![4.0, 5.0, 6.0]
        );
        assert_eq!(
            reduce_along_axis(&a, 1, ReductionMethod::Sum).unwrap().into_raw_vec(),
            vec![9.0, 12.0]
        );
    }

    #[test]
    fn all_invalid_lanes_give_nan() {
        let a = arr2(&[[1.0, f64::NAN], [3.0, f64::NAN]]).into_dyn();
        for method in [
            ReductionMethod::Average,
            ReductionMethod::Sum,
            ReductionMethod::Min,
            ReductionMethod::Max,
        ] {
            let r = reduce_along_axis(&a, 0, method).unwrap();
            assert!(r[[0]].is_finite(), "{}", method.as_str());
            assert!(r[[1]].is_nan(), "{}", method.as_str());
        }
        assert_eq!(reduce_along_axis(&a, 0, ReductionMethod::Sum).unwrap()[[0]], 4.0);
        assert!(reduce_along_axis(&a, 0, ReductionMethod::ElementSelection(1)).unwrap()[[1]].is_nan());
    }

    #[test]
    fn reduces_middle_axis_of_3d() {
        let a = ArrayD::from_shape_vec(IxDyn(&[2, 3, 2]), (0..12).map(f64::from).collect()).unwrap();
        let s = reduce_along_axis(&a, 1, ReductionMethod::Sum).unwrap();
        assert_eq!(s.shape(), &[2, 2]);
        assert_eq!(s.into_raw_vec(), vec![6.0, 9.0, 24.0, 27.0]);
        let m = reduce_along_axis(&a, 1, ReductionMethod::Max).unwrap();
        assert_eq!(m.into_raw_vec(), vec![4.0, 5.0, 10.0, 11.0]);
    }

    #[test]
    fn element_selection_out_of_range() {
        let a = ArrayD::<f64>::zeros(IxDyn(&[2, 3]));
        assert!(reduce_along_axis(&a, 1, ReductionMethod::ElementSelection(3)).is_err());
        assert!(reduce_along_axis(&a, 2, ReductionMethod::Average).is_err());
    }

    #[test]
    fn parse_methods() {
        assert_eq!("mean".parse::<ReductionMethod>().unwrap(), ReductionMethod::Average);
        assert_eq!("Max".parse::<ReductionMethod>().unwrap(), ReductionMethod::Max);
        assert_eq!(
            "index=2".parse::<ReductionMethod>().unwrap(),
            ReductionMethod::ElementSelection(2)
        );
        assert_eq!("0".parse::<ReductionMethod>().unwrap(), ReductionMethod::ElementSelection(0));
        assert!("median".parse::<ReductionMethod>().is_err());
    }

    #[test]
    fn medians() {
        let a = ArrayD::from_shape_vec(IxDyn(&[4]), vec![0.0, 1.0, 4.0, 7.0]).unwrap();
        assert_eq!(nan_median(&a), Some(2.5));
        assert_eq!(nan_median(&ArrayD::zeros(IxDyn(&[0]))), None);
    }
}
