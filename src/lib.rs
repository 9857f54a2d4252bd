//! datadict: dependency-aware containers for measurement data
//!
//! A library for holding, validating and reshaping scientific measurement
//! data. Every variable is a [`DataField`] with a unit, optional axes it
//! depends on, an `f64` value array (NaN marks invalid entries) and free-form
//! metadata. Containers come in two layouts:
//!
//! - [`DataDict`]: tabular data, one record per index of the leading dimension
//! - [`MeshgridDataDict`]: gridded data, every field holding the full grid
//!
//! ## Key Features
//!
//! - **Validation**: every violated invariant is reported in one pass
//! - **Grid Inference**: infer grid shape and sweep order from axis values
//! - **Reductions**: average, sum, min, max or element selection along an axis, in parallel with Rayon
//! - **Processing Nodes**: select, grid, reduce, differentiate, histogram and rescale data in a linear flowchart
//! - **NetCDF Storage**: save and load tabular data in named groups, with append modes
//!
//! ## Module Organization
//!
//! - [`field`]: data fields and metadata keys
//! - [`base`]: the shared container and the [`DataContainer`] trait
//! - [`datadict`] / [`meshgrid`]: the two layouts
//! - [`grid`]: conversion between them
//! - [`num`]: numerical tools (grid guessing, cropping, edges)
//! - [`reduction`]: axis reductions and NaN-aware statistics
//! - [`node`]: processing nodes and [`Flowchart`]
//! - [`config`]: JSON pipeline descriptions
//! - [`storage`]: NetCDF files
//! - [`inspect`]: structure listings and summaries
//! - [`parallel`]: thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//! ```rust,no_run
//! use datadict::prelude::*;
//!
//! let data = datadict::testdata::one_2d_set(10, 5).unwrap();
//! let grid = datadict_to_meshgrid(&data, None, None).unwrap();
//! assert_eq!(grid.shape(), Some(vec![10, 5]));
//!
//! let averaged = grid.mean("y").unwrap();
//! datadict_to_netcdf(&meshgrid_to_datadict(&averaged).unwrap(), "avg.nc".as_ref(), AppendMode::None).unwrap();
//! ```

pub mod base;
pub mod config;
pub mod datadict;
pub mod errors;
pub mod field;
pub mod grid;
pub mod inspect;
pub mod meshgrid;
pub mod node;
pub mod num;
pub mod parallel;
pub mod reduction;
pub mod storage;
pub mod testdata;

pub use base::{same_structure, DataContainer, DataDictBase};
pub use datadict::DataDict;
pub use errors::*;
pub use field::{is_meta_key, meta_key_to_name, meta_name_to_key, DataField, Meta};
pub use grid::{datadict_to_meshgrid, guess_shape_from_datadict, meshgrid_to_datadict};
pub use meshgrid::MeshgridDataDict;
pub use node::{
    DataGridder, DataSelector, Differentiation, DimensionReducer, Flowchart, GridOption, Histogrammer, Node, NodeData,
    ScaleMode, ScaleUnits, SubtractAverage, XYSelector,
};
pub use parallel::*;
pub use reduction::{reduce_along_axis, ReductionMethod};
pub use storage::{
    all_datadicts_from_netcdf, datadict_from_netcdf, datadict_from_netcdf_group, datadict_to_netcdf,
    datadict_to_netcdf_group, group_names, AppendMode, LoadOptions, DEFAULT_GROUP,
};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::base::{DataContainer, DataDictBase};
    pub use crate::datadict::DataDict;
    pub use crate::errors::{DataDictError, Result};
    pub use crate::field::DataField;
    pub use crate::grid::{datadict_to_meshgrid, meshgrid_to_datadict};
    pub use crate::meshgrid::MeshgridDataDict;
    pub use crate::node::{Flowchart, Node, NodeData};
    pub use crate::parallel::ParallelConfig;
    pub use crate::reduction::ReductionMethod;
    pub use crate::storage::{
        all_datadicts_from_netcdf, datadict_from_netcdf, datadict_from_netcdf_group, datadict_to_netcdf,
        datadict_to_netcdf_group, AppendMode, LoadOptions,
    };
}
