use super::{Node, NodeData};
use crate::base::{DataContainer, DataDictBase};
use crate::errors::{DataDictError, Result};
use crate::field::DataField;
use crate::meshgrid::MeshgridDataDict;
use crate::reduction::{nan_min_max, reduce_along_axis, ReductionMethod};
use ndarray::{Array1, ArrayD, Axis, IxDyn};

pub const DEFAULT_NBINS: usize = 51;

/// Replaces each dependent by a histogram of its values.
///
/// On a meshgrid the counting runs along the chosen axis, which is replaced
/// by a new axis named after the dependent holding the bin centers; the
/// counts are stored as `<dependent>_count`. Tabular data is histogrammed
/// as a whole. Without an axis, data is passed through.
#[derive(Debug, Clone)]
pub struct Histogrammer {
    axis: Option<String>,
    nbins: usize,
}

impl Default for Histogrammer {
    fn default() -> Self {
        Self {
            axis: None,
            nbins: DEFAULT_NBINS,
        }
    }
}

/// Equally sized bins spanning `[min, max]`; the last bin includes `max`
#[derive(Debug, Clone, Copy)]
struct Bins {
    start: f64,
    width: f64,
    n: usize,
}

impl Bins {
    fn new(min: f64, max: f64, n: usize) -> Self {
        let (start, stop) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
        Self {
            start,
            width: (stop - start) / n as f64,
            n,
        }
    }

    fn index(&self, v: f64) -> Option<usize> {
        if !v.is_finite() {
            return None;
        }
        let i = ((v - self.start) / self.width).floor();
        if i < 0.0 {
            return None;
        }
        Some((i as usize).min(self.n - 1))
    }

    fn centers(&self) -> Array1<f64> {
        Array1::from_iter((0..self.n).map(|i| self.start + (i as f64 + 0.5) * self.width))
    }

    fn count<'a>(&self, values: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
        let mut counts = vec![0.0; self.n];
        for i in values.into_iter().filter_map(|&v| self.index(v)) {
            counts[i] += 1.0;
        }
        counts
    }
}

fn broadcast_to(values: &ArrayD<f64>, shape: &[usize]) -> Result<ArrayD<f64>> {
    values
        .broadcast(IxDyn(shape))
        .map(|v| v.to_owned())
        .ok_or_else(|| DataDictError::InvalidShape {
            message: format!("cannot broadcast {:?} to {shape:?}", values.shape()),
        })
}

impl Histogrammer {
    pub fn new(axis: Option<&str>, nbins: usize) -> Self {
        Self {
            axis: axis.map(str::to_string),
            nbins,
        }
    }

    pub fn axis(&self) -> Option<&str> {
        self.axis.as_deref()
    }

    pub fn nbins(&self) -> usize {
        self.nbins
    }

    /// Histogram of one dependent; `None` if it has no valid values
    fn histogram(&self, data: &DataDictBase, dep: &str, axis: Option<usize>) -> Result<Option<MeshgridDataDict>> {
        let field = data.field(dep)?;
        let Some((min, max)) = nan_min_max(&field.values) else {
            return Ok(None);
        };
        let bins = Bins::new(min, max, self.nbins);

        let mut axes = field.axes.clone();
        let (counts, shape) = match axis {
            Some(idx) => {
                axes.remove(idx);
                let mut shape = field.values.shape().to_vec();
                shape.remove(idx);
                shape.push(self.nbins);
                let counts: Vec<f64> = field
                    .values
                    .lanes(Axis(idx))
                    .into_iter()
                    .flat_map(|lane| bins.count(lane.iter()))
                    .collect();
                (counts, shape)
            }
            None => {
                axes.clear();
                (bins.count(field.values.iter()), vec![self.nbins])
            }
        };

        let count_axes: Vec<String> = axes.iter().cloned().chain(std::iter::once(dep.to_string())).collect();
        let mut hist = MeshgridDataDict::new().with_field(
            &format!("{dep}_count"),
            DataField::new(ArrayD::from_shape_vec(IxDyn(&shape), counts)?).with_axes(&count_axes),
        );
        let centers = broadcast_to(&bins.centers().into_dyn(), &shape)?;
        hist.add_field(dep, DataField::new(centers).with_unit(&field.unit));

        // the remaining axes are constant along the bins
        if let Some(idx) = axis {
            for ax in &axes {
                let src = data.field(ax)?;
                let avg = reduce_along_axis(&src.values, idx, ReductionMethod::Average)?;
                let mut out = src.clone();
                out.values = broadcast_to(&avg.insert_axis(Axis(shape.len() - 1)), &shape)?;
                hist.add_field(ax, out);
            }
        }
        Ok(Some(hist))
    }
}

impl Node for Histogrammer {
    fn name(&self) -> &str {
        "Histogrammer"
    }

    fn process(&self, data: NodeData) -> Result<Option<NodeData>> {
        let Some(axis) = &self.axis else {
            return Ok(Some(data));
        };
        if self.nbins == 0 {
            return Err(DataDictError::invalid_input("number of bins must be positive"));
        }
        let base = data.base();
        if !base.axes().contains(axis) {
            return Err(DataDictError::invalid_input(format!("'{axis}' is not a valid axis.")));
        }

        let mut out = MeshgridDataDict::new();
        for dep in base.dependents() {
            let idx = if data.is_meshgrid() {
                let axes = &base.field(&dep)?.axes;
                let idx = axes
                    .iter()
                    .position(|a| a == axis)
                    .ok_or_else(|| DataDictError::invalid_input(format!("'{dep}' does not depend on '{axis}'")))?;
                Some(idx)
            } else {
                None
            };
            let Some(hist) = self.histogram(base, &dep, idx)? else {
                log::warn!("'{dep}' has no valid values to histogram");
                return Ok(None);
            };
            for (name, field) in hist.data_items() {
                if !out.contains(name) {
                    out.add_field(name, field.clone());
                }
            }
        }
        out.validate()?;
        Ok(Some(NodeData::Meshgrid(out)))
    }
}
