//! Defines command-line interface options using `clap` for the datadict tool.

use clap::Parser;
use datadict::config::{GridChoice, NodeConfig, PipelineConfig};
use datadict::node::DEFAULT_NBINS;
use datadict::{AppendMode, ReductionMethod, ScaleMode, DEFAULT_GROUP};
use indexmap::IndexMap;
use std::path::PathBuf;

/// A CLI tool for inspecting and reshaping measurement data
#[derive(Parser, Debug)]
#[command(
    version,
    name = "datadict",
    about = "Inspect, select, grid and reduce measurement data stored in NetCDF files"
)]
pub struct Args {
    /// Path to the NetCDF data file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Group of the file to load
    #[arg(short, long, default_value = DEFAULT_GROUP)]
    pub group: String,

    /// List the groups stored in the file
    #[arg(long)]
    pub list_groups: bool,

    /// List axes and dependents
    #[arg(long)]
    pub list: bool,

    /// Describe a field (unit, axes, shape and meta data)
    #[arg(long)]
    pub describe: Option<String>,

    /// Compute quick statistics (min/mean/max/std) for a field
    #[arg(long)]
    pub summary: Option<String>,

    /// Keep only these dependents (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Place data on a grid: 'guess', 'none', or a shape like '10x5'
    #[arg(long, value_parser = parse_grid_arg)]
    pub grid: Option<GridArg>,

    /// Reduce a grid axis, formatted as <axis>:<method> (average, sum, min, max or an index)
    #[arg(long, value_parser = parse_reduce_arg)]
    pub reduce: Vec<(String, ReductionMethod)>,

    /// Keep only the x (and y) axes, formatted as <x>[,<y>]
    #[arg(long, value_parser = parse_xy_arg)]
    pub xy: Option<(String, Option<String>)>,

    /// Subtract the average along a grid axis from all dependents
    #[arg(long)]
    pub subtract_average: Option<String>,

    /// Differentiate along a grid axis
    #[arg(long)]
    pub diff: Option<String>,

    /// Histogram the dependents along an axis, formatted as <axis>[:<nbins>]
    #[arg(long, value_parser = parse_histogram_arg)]
    pub histogram: Option<(String, usize)>,

    /// Rescale values to engineering units
    #[arg(long)]
    pub scale_units: bool,

    /// JSON file describing the processing pipeline; replaces the processing flags
    #[arg(long)]
    pub pipeline: Option<PathBuf>,

    /// Save the (tabular) result to this NetCDF file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Group to save the result to; defaults to the loaded group
    #[arg(long)]
    pub output_group: Option<String>,

    /// How to treat an existing output group: none (overwrite), new or all
    #[arg(long, value_parser = parse_append_arg, default_value = "none")]
    pub append: AppendMode,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridArg {
    None,
    Guess,
    Shape(Vec<usize>),
}

fn parse_grid_arg(s: &str) -> Result<GridArg, String> {
    match s {
        "guess" => Ok(GridArg::Guess),
        "none" => Ok(GridArg::None),
        shape => shape
            .split('x')
            .map(|n| n.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map(GridArg::Shape)
            .map_err(|_| "Invalid format: Expected 'guess', 'none' or a shape like '10x5'.".to_string()),
    }
}

fn parse_reduce_arg(s: &str) -> Result<(String, ReductionMethod), String> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [axis, method] => method
            .parse::<ReductionMethod>()
            .map(|m| (axis.to_string(), m))
            .map_err(|e| e.to_string()),
        _ => Err("Invalid format: Expected '<axis>:<method>'.".to_string()),
    }
}

fn parse_xy_arg(s: &str) -> Result<(String, Option<String>), String> {
    let parts: Vec<&str> = s.split(',').collect();
    match parts.as_slice() {
        [x] if !x.is_empty() => Ok((x.to_string(), None)),
        [x, y] if !x.is_empty() && !y.is_empty() => Ok((x.to_string(), Some(y.to_string()))),
        _ => Err("Invalid format: Expected '<x>' or '<x>,<y>'.".to_string()),
    }
}

fn parse_histogram_arg(s: &str) -> Result<(String, usize), String> {
    match s.split_once(':') {
        None if !s.is_empty() => Ok((s.to_string(), DEFAULT_NBINS)),
        Some((axis, nbins)) if !axis.is_empty() => match nbins.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok((axis.to_string(), n)),
            _ => Err("Invalid number of bins: Expected a positive integer.".to_string()),
        },
        _ => Err("Invalid format: Expected '<axis>' or '<axis>:<nbins>'.".to_string()),
    }
}

fn parse_append_arg(s: &str) -> Result<AppendMode, String> {
    match s {
        "none" => Ok(AppendMode::None),
        "new" => Ok(AppendMode::New),
        "all" => Ok(AppendMode::All),
        _ => Err("Invalid append mode: Expected 'none', 'new' or 'all'.".to_string()),
    }
}

impl Args {
    /// True if any processing was requested
    pub fn has_processing(&self) -> bool {
        self.pipeline.is_some()
            || !self.select.is_empty()
            || self.grid.is_some()
            || !self.reduce.is_empty()
            || self.xy.is_some()
            || self.subtract_average.is_some()
            || self.diff.is_some()
            || self.histogram.is_some()
            || self.scale_units
    }

    /// Pipeline from the processing flags, in this order: select, grid,
    /// reduce, xy, subtract average, diff, histogram, scale units
    pub fn flag_pipeline(&self) -> PipelineConfig {
        let mut nodes = Vec::new();
        if !self.select.is_empty() {
            nodes.push(NodeConfig::Select {
                names: self.select.clone(),
            });
        }
        if let Some(grid) = &self.grid {
            let (option, shape) = match grid {
                GridArg::None => (GridChoice::None, None),
                GridArg::Guess => (GridChoice::Guess, None),
                GridArg::Shape(shape) => (GridChoice::Shape, Some(shape.clone())),
            };
            nodes.push(NodeConfig::Grid {
                option,
                shape,
                order: None,
            });
        }
        if !self.reduce.is_empty() {
            nodes.push(NodeConfig::Reduce {
                reductions: self.reduce.iter().cloned().collect::<IndexMap<_, _>>(),
            });
        }
        if let Some((x, y)) = &self.xy {
            nodes.push(NodeConfig::Xy {
                x: x.clone(),
                y: y.clone(),
                reductions: IndexMap::new(),
            });
        }
        if let Some(axis) = &self.subtract_average {
            nodes.push(NodeConfig::SubtractAverage {
                axis: Some(axis.clone()),
            });
        }
        if let Some(axis) = &self.diff {
            nodes.push(NodeConfig::Differentiate {
                axis: Some(axis.clone()),
            });
        }
        if let Some((axis, nbins)) = &self.histogram {
            nodes.push(NodeConfig::Histogram {
                axis: Some(axis.clone()),
                nbins: *nbins,
            });
        }
        if self.scale_units {
            nodes.push(NodeConfig::ScaleUnits {
                mode: ScaleMode::Always,
            });
        }
        PipelineConfig { nodes }
    }
}
