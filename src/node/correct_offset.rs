use super::{Node, NodeData};
use crate::errors::Result;
use crate::reduction::{reduce_along_axis, ReductionMethod};
use ndarray::Axis;

/// Subtracts from every dependent its average along one grid axis.
///
/// Invalid values are left out of the average. Tabular data, or data
/// without the axis, is passed through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SubtractAverage {
    axis: Option<String>,
}

impl SubtractAverage {
    pub fn new(axis: Option<&str>) -> Self {
        Self {
            axis: axis.map(str::to_string),
        }
    }

    pub fn axis(&self) -> Option<&str> {
        self.axis.as_deref()
    }
}

impl Node for SubtractAverage {
    fn name(&self) -> &str {
        "SubtractAverage"
    }

    fn process(&self, data: NodeData) -> Result<Option<NodeData>> {
        let (Some(axis), NodeData::Meshgrid(grid)) = (&self.axis, &data) else {
            return Ok(Some(data));
        };
        let Some(idx) = grid.axes().iter().position(|a| a == axis) else {
            log::debug!("'{axis}' is not a grid axis, no offset to subtract");
            return Ok(Some(data));
        };

        let mut out = grid.clone();
        for (_, field) in out.data_items_mut().filter(|(_, f)| f.is_dependent()) {
            let avg = reduce_along_axis(&field.values, idx, ReductionMethod::Average)?.insert_axis(Axis(idx));
            field.values.zip_mut_with(&avg, |v, a| *v -= a);
        }
        Ok(Some(NodeData::Meshgrid(out)))
    }
}
