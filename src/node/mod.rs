//! Processing nodes and the linear flowchart that chains them
//!
//! A node takes one data container and returns a new one, or `None` when it
//! has nothing to pass on (which stops the chain).

mod correct_offset;
mod differentiation;
mod dim_reducer;
mod gridder;
mod histogram;
mod scale_units;
mod selector;

pub use correct_offset::SubtractAverage;
pub use differentiation::Differentiation;
pub use dim_reducer::{DimensionReducer, XYSelector};
pub use gridder::{DataGridder, GridOption};
pub use histogram::{Histogrammer, DEFAULT_NBINS};
pub use scale_units::{scale_and_prefix, ScaleMode, ScaleUnits};
pub use selector::DataSelector;

use crate::base::{DataContainer, DataDictBase};
use crate::datadict::DataDict;
use crate::errors::Result;
use crate::meshgrid::MeshgridDataDict;

/// Data passed between nodes
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Tabular(DataDict),
    Meshgrid(MeshgridDataDict),
}

impl NodeData {
    pub fn base(&self) -> &DataDictBase {
        match self {
            Self::Tabular(d) => d.base(),
            Self::Meshgrid(d) => d.base(),
        }
    }

    pub fn base_mut(&mut self) -> &mut DataDictBase {
        match self {
            Self::Tabular(d) => d.base_mut(),
            Self::Meshgrid(d) => d.base_mut(),
        }
    }

    pub fn is_meshgrid(&self) -> bool {
        matches!(self, Self::Meshgrid(_))
    }

    /// Get the string representation of the container kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Tabular(_) => "tabular",
            Self::Meshgrid(_) => "meshgrid",
        }
    }

    pub fn as_tabular(&self) -> Option<&DataDict> {
        match self {
            Self::Tabular(d) => Some(d),
            Self::Meshgrid(_) => None,
        }
    }

    pub fn as_meshgrid(&self) -> Option<&MeshgridDataDict> {
        match self {
            Self::Meshgrid(d) => Some(d),
            Self::Tabular(_) => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Tabular(d) => d.validate(),
            Self::Meshgrid(d) => d.validate(),
        }
    }
}

impl From<DataDict> for NodeData {
    fn from(d: DataDict) -> Self {
        Self::Tabular(d)
    }
}

impl From<MeshgridDataDict> for NodeData {
    fn from(d: MeshgridDataDict) -> Self {
        Self::Meshgrid(d)
    }
}

/// A processing step of a [`Flowchart`]
pub trait Node {
    /// Name shown in logs and listings
    fn name(&self) -> &str;

    /// Process incoming data
    ///
    /// # Errors
    ///
    /// Returns an error if the node options do not fit the data; outcomes
    /// that simply leave nothing to pass on are `Ok(None)`.
    fn process(&self, data: NodeData) -> Result<Option<NodeData>>;
}

/// A linear chain of nodes; the output of each is the input of the next
#[derive(Default)]
pub struct Flowchart {
    nodes: Vec<Box<dyn Node>>,
}

impl Flowchart {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_node(mut self, node: impl Node + 'static) -> Self {
        self.push(Box::new(node));
        self
    }

    pub fn push(&mut self, node: Box<dyn Node>) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name()).collect()
    }

    /// Run `data` through all nodes, in order.
    pub fn run(&self, data: NodeData) -> Result<Option<NodeData>> {
        let mut current = data;
        for node in &self.nodes {
            log::debug!("Running node '{}' on {} data", node.name(), current.kind());
            match node.process(current)? {
                Some(out) => current = out,
                None => {
                    log::debug!("Node '{}' produced no output, stopping", node.name());
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }
}

impl std::fmt::Debug for Flowchart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flowchart")
            .field("nodes", &self.node_names())
            .finish()
    }
}
