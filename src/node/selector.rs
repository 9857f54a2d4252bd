use super::{Node, NodeData};
use crate::base::DataContainer;
use crate::errors::Result;

/// Keeps a set of dependents (with their axes) and drops everything else.
///
/// All selected fields must have the same axes; otherwise nothing is passed on.
#[derive(Debug, Clone, Default)]
pub struct DataSelector {
    names: Vec<String>,
}

impl DataSelector {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
        }
    }

    pub fn selected(&self) -> &[String] {
        &self.names
    }
}

impl Node for DataSelector {
    fn name(&self) -> &str {
        "DataSelector"
    }

    fn process(&self, data: NodeData) -> Result<Option<NodeData>> {
        if self.names.is_empty() {
            return Ok(None);
        }

        let base = data.base();
        let first = &base.field(&self.names[0])?.axes;
        for name in &self.names[1..] {
            let axes = &base.field(name)?.axes;
            if axes != first {
                log::warn!(
                    "'{}' (axes {first:?}) and '{name}' (axes {axes:?}) are not compatible and cannot be selected together",
                    self.names[0]
                );
                return Ok(None);
            }
        }

        let out = match &data {
            NodeData::Tabular(d) => NodeData::Tabular(d.extract(&self.names, true, true)?),
            NodeData::Meshgrid(d) => NodeData::Meshgrid(d.extract(&self.names, true, true)?),
        };
        Ok(Some(out))
    }
}
