use super::{Node, NodeData};
use crate::base::DataContainer;
use crate::errors::{DataDictError, Result};
use crate::meshgrid::MeshgridDataDict;
use crate::reduction::ReductionMethod;
use indexmap::IndexMap;

/// Removes grid axes by reducing all fields along them.
///
/// Only meshgrid data can be reduced; tabular data is passed through.
#[derive(Debug, Clone, Default)]
pub struct DimensionReducer {
    reductions: IndexMap<String, ReductionMethod>,
}

fn apply_reductions(
    mut data: MeshgridDataDict,
    reductions: &IndexMap<String, ReductionMethod>,
) -> Result<MeshgridDataDict> {
    for (axis, method) in reductions {
        log::debug!("Reducing axis '{axis}' by {}", method.as_str());
        data = data.reduce(axis, *method)?;
    }
    Ok(data)
}

impl DimensionReducer {
    pub fn new(reductions: IndexMap<String, ReductionMethod>) -> Self {
        Self { reductions }
    }

    #[must_use]
    pub fn with_reduction(mut self, axis: &str, method: ReductionMethod) -> Self {
        self.reductions.insert(axis.to_string(), method);
        self
    }

    pub fn reductions(&self) -> &IndexMap<String, ReductionMethod> {
        &self.reductions
    }
}

impl Node for DimensionReducer {
    fn name(&self) -> &str {
        "DimensionReducer"
    }

    fn process(&self, data: NodeData) -> Result<Option<NodeData>> {
        match data {
            NodeData::Tabular(d) => Ok(Some(NodeData::Tabular(d))),
            NodeData::Meshgrid(d) => Ok(Some(NodeData::Meshgrid(apply_reductions(d, &self.reductions)?))),
        }
    }
}

/// Reduces data to one (x) or two (x, y) axes.
///
/// On meshgrids every other axis is reduced, by the configured method or by
/// selecting its first element. On tabular data other axes are dropped from
/// the dependents. Output axes are ordered x, y.
#[derive(Debug, Clone)]
pub struct XYSelector {
    x: String,
    y: Option<String>,
    reductions: IndexMap<String, ReductionMethod>,
}

impl XYSelector {
    pub fn new(x: &str, y: Option<&str>) -> Self {
        Self {
            x: x.to_string(),
            y: y.map(str::to_string),
            reductions: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_reduction(mut self, axis: &str, method: ReductionMethod) -> Self {
        self.reductions.insert(axis.to_string(), method);
        self
    }

    fn selected(&self) -> Vec<&str> {
        std::iter::once(self.x.as_str()).chain(self.y.as_deref()).collect()
    }

    fn check_axes(&self, axes: &[String]) -> Result<()> {
        if self.y.as_deref() == Some(self.x.as_str()) {
            return Err(DataDictError::invalid_input(format!(
                "x and y must be different axes, both are '{}'",
                self.x
            )));
        }
        for ax in self.selected() {
            if !axes.iter().any(|a| a == ax) {
                return Err(DataDictError::invalid_input(format!("'{ax}' is not among the axes {axes:?}")));
            }
        }
        Ok(())
    }

    fn process_meshgrid(&self, data: MeshgridDataDict) -> Result<MeshgridDataDict> {
        let axes = data.axes();
        self.check_axes(&axes)?;
        let selected = self.selected();

        let reductions: IndexMap<String, ReductionMethod> = axes
            .iter()
            .filter(|a| !selected.contains(&a.as_str()))
            .map(|a| {
                let method = self
                    .reductions
                    .get(a)
                    .copied()
                    .unwrap_or(ReductionMethod::ElementSelection(0));
                (a.clone(), method)
            })
            .collect();
        let mut data = apply_reductions(data, &reductions)?;

        let positions: Vec<(&str, usize)> = selected.iter().enumerate().map(|(i, a)| (*a, i)).collect();
        data.reorder_axes(&positions)?;
        Ok(data)
    }
}

impl Node for XYSelector {
    fn name(&self) -> &str {
        "XYSelector"
    }

    fn process(&self, data: NodeData) -> Result<Option<NodeData>> {
        match data {
            NodeData::Meshgrid(d) => Ok(Some(NodeData::Meshgrid(self.process_meshgrid(d)?))),
            NodeData::Tabular(mut d) => {
                self.check_axes(&d.axes())?;
                let selected: Vec<String> = self.selected().into_iter().map(str::to_string).collect();
                let dropped: Vec<String> = d
                    .dependents()
                    .into_iter()
                    .filter(|dep| {
                        d.field(dep)
                            .map(|f| !selected.iter().all(|s| f.axes.contains(s)))
                            .unwrap_or(true)
                    })
                    .collect();
                for dep in &dropped {
                    log::debug!("Dropping '{dep}', it does not depend on {selected:?}");
                    d.take_field(dep)?;
                }
                if d.dependents().is_empty() {
                    return Ok(None);
                }
                for (_, field) in d.data_items_mut() {
                    if field.is_dependent() {
                        field.axes = selected.clone();
                    }
                }
                d.sanitize()?;
                d.validate()?;
                Ok(Some(NodeData::Tabular(d)))
            }
        }
    }
}
