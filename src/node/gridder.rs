use super::{Node, NodeData};
use crate::errors::Result;
use crate::grid::{datadict_to_meshgrid, meshgrid_to_datadict};

/// How a [`DataGridder`] places data on a grid
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GridOption {
    /// Tabular output; meshgrids are flattened
    NoGrid,
    /// Infer the grid from the axis values
    #[default]
    GuessShape,
    /// Use the given shape; `order` names the sweep order of the axes
    /// (slowest first) when it differs from the declared one
    SpecifyShape {
        shape: Vec<usize>,
        order: Option<Vec<String>>,
    },
}

/// Converts between tabular and gridded data
#[derive(Debug, Clone, Default)]
pub struct DataGridder {
    option: GridOption,
}

impl DataGridder {
    pub fn new(option: GridOption) -> Self {
        Self { option }
    }

    pub fn option(&self) -> &GridOption {
        &self.option
    }
}

impl Node for DataGridder {
    fn name(&self) -> &str {
        "DataGridder"
    }

    fn process(&self, data: NodeData) -> Result<Option<NodeData>> {
        match (data, &self.option) {
            (NodeData::Tabular(d), GridOption::NoGrid) => Ok(Some(NodeData::Tabular(d))),
            (NodeData::Tabular(d), GridOption::GuessShape) => match datadict_to_meshgrid(&d, None, None) {
                Ok(grid) => Ok(Some(NodeData::Meshgrid(grid))),
                Err(e) => {
                    log::warn!("Could not grid data: {e}");
                    Ok(None)
                }
            },
            (NodeData::Tabular(d), GridOption::SpecifyShape { shape, order }) => {
                match datadict_to_meshgrid(&d, Some(shape.as_slice()), order.as_deref()) {
                    Ok(grid) => Ok(Some(NodeData::Meshgrid(grid))),
                    Err(e) => {
                        log::warn!("Could not grid data to shape {shape:?}: {e}");
                        Ok(None)
                    }
                }
            }
            (NodeData::Meshgrid(d), GridOption::NoGrid) => Ok(Some(NodeData::Tabular(meshgrid_to_datadict(&d)?))),
            (NodeData::Meshgrid(d), GridOption::GuessShape) => Ok(Some(NodeData::Meshgrid(d))),
            (NodeData::Meshgrid(d), GridOption::SpecifyShape { .. }) => {
                log::warn!("Data is already on grid. Ignore shape.");
                Ok(Some(NodeData::Meshgrid(d)))
            }
        }
    }
}
