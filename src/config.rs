//! Processing pipelines described in JSON
//!
//! ```json
//! {"nodes": [
//!     {"type": "select", "names": ["z"]},
//!     {"type": "grid", "option": "guess"},
//!     {"type": "reduce", "reductions": {"y": "average"}},
//!     {"type": "subtract_average", "axis": "x"}
//! ]}
//! ```

use crate::errors::{DataDictError, Result};
use crate::node::{
    DataGridder, DataSelector, Differentiation, DimensionReducer, Flowchart, GridOption, Histogrammer, Node, ScaleMode,
    ScaleUnits, SubtractAverage, XYSelector, DEFAULT_NBINS,
};
use crate::reduction::ReductionMethod;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Gridding choice of a `grid` node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridChoice {
    None,
    #[default]
    Guess,
    Shape,
}

/// One pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    Select {
        names: Vec<String>,
    },
    Grid {
        #[serde(default)]
        option: GridChoice,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shape: Option<Vec<usize>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<Vec<String>>,
    },
    Reduce {
        reductions: IndexMap<String, ReductionMethod>,
    },
    Xy {
        x: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<String>,
        #[serde(default)]
        reductions: IndexMap<String, ReductionMethod>,
    },
    ScaleUnits {
        #[serde(default)]
        mode: ScaleMode,
    },
    SubtractAverage {
        axis: Option<String>,
    },
    Differentiate {
        axis: Option<String>,
    },
    Histogram {
        axis: Option<String>,
        #[serde(default = "default_nbins")]
        nbins: usize,
    },
}

fn default_nbins() -> usize {
    DEFAULT_NBINS
}

impl NodeConfig {
    /// Build the node described by this step
    pub fn build(&self) -> Result<Box<dyn Node>> {
        let node: Box<dyn Node> = match self {
            Self::Select { names } => Box::new(DataSelector::new(names)),
            Self::Grid { option, shape, order } => {
                let option = match (option, shape) {
                    (GridChoice::None, _) => GridOption::NoGrid,
                    (GridChoice::Guess, None) => GridOption::GuessShape,
                    (_, Some(shape)) => GridOption::SpecifyShape {
                        shape: shape.clone(),
                        order: order.clone(),
                    },
                    (GridChoice::Shape, None) => {
                        return Err(DataDictError::invalid_input("grid option 'shape' requires a 'shape' entry"));
                    }
                };
                Box::new(DataGridder::new(option))
            }
            Self::Reduce { reductions } => Box::new(DimensionReducer::new(reductions.clone())),
            Self::Xy { x, y, reductions } => {
                let mut node = XYSelector::new(x, y.as_deref());
                for (axis, method) in reductions {
                    node = node.with_reduction(axis, *method);
                }
                Box::new(node)
            }
            Self::ScaleUnits { mode } => Box::new(ScaleUnits::new(*mode)),
            Self::SubtractAverage { axis } => Box::new(SubtractAverage::new(axis.as_deref())),
            Self::Differentiate { axis } => Box::new(Differentiation::new(axis.as_deref())),
            Self::Histogram { axis, nbins } => Box::new(Histogrammer::new(axis.as_deref(), *nbins)),
        };
        Ok(node)
    }
}

/// A linear chain of processing steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub nodes: Vec<NodeConfig>,
}

impl PipelineConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        log::debug!("Read pipeline from {}", path.display());
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a flowchart running all steps in order
    pub fn to_flowchart(&self) -> Result<Flowchart> {
        let mut fc = Flowchart::new();
        for node in &self.nodes {
            fc.push(node.build()?);
        }
        Ok(fc)
    }
}
