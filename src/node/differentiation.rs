use super::{Node, NodeData};
use crate::base::DataContainer;
use crate::errors::Result;
use ndarray::{ArrayD, Axis, Slice};

/// Differences of neighbouring grid points along one axis.
///
/// Dependents are replaced by their first differences along the axis; every
/// other field loses its last element along it so that shapes keep matching.
/// Tabular data, or data without the axis, is passed through unchanged.
#[derive(Debug, Clone, Default)]
pub struct Differentiation {
    axis: Option<String>,
}

/// `values[1..] - values[..n-1]` along `axis`
fn diff_along(values: &ArrayD<f64>, axis: usize) -> ArrayD<f64> {
    let n = values.len_of(Axis(axis));
    if n == 0 {
        return values.clone();
    }
    let upper = values.slice_axis(Axis(axis), Slice::from(1..));
    let lower = values.slice_axis(Axis(axis), Slice::from(..n - 1));
    &upper - &lower
}

fn drop_last(values: &ArrayD<f64>, axis: usize) -> ArrayD<f64> {
    let n = values.len_of(Axis(axis));
    values
        .slice_axis(Axis(axis), Slice::from(..n.saturating_sub(1)))
        .to_owned()
}

impl Differentiation {
    pub fn new(axis: Option<&str>) -> Self {
        Self {
            axis: axis.map(str::to_string),
        }
    }

    pub fn axis(&self) -> Option<&str> {
        self.axis.as_deref()
    }
}

impl Node for Differentiation {
    fn name(&self) -> &str {
        "Differentiation"
    }

    fn process(&self, data: NodeData) -> Result<Option<NodeData>> {
        let (Some(axis), NodeData::Meshgrid(grid)) = (&self.axis, &data) else {
            return Ok(Some(data));
        };
        let axes = grid.axes();
        let Some(idx) = axes.iter().position(|a| a == axis) else {
            log::debug!("'{axis}' is not a grid axis, nothing to differentiate");
            return Ok(Some(data));
        };

        let mut out = grid.clone();
        for (name, field) in out.data_items_mut() {
            field.values = if field.is_dependent() {
                log::debug!("Differentiating '{name}' along '{axis}'");
                diff_along(&field.values, idx)
            } else {
                drop_last(&field.values, idx)
            };
        }
        out.validate()?;
        Ok(Some(NodeData::Meshgrid(out)))
    }
}
