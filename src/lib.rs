//! Fit a dataset filter on one dataset and apply the fitted transformation,
//! unchanged, to a second.
//!
//! * [`data`] – datasets and the ARFF / CSV / JSON / Parquet readers and writers
//! * [`filter`] – the filter protocol, the built-in filters and their registry
//! * [`driver`] – validated run configuration and the two-dataset run
//! * [`session`] – scoped resource search path for one run

pub mod cli;
pub mod data;
pub mod driver;
pub mod error;
pub mod filter;
pub mod session;

pub use data::model::{Column, Dataset, Domain, Row, Schema, Value};
pub use driver::{run, RunConfig, RunReport};
pub use error::{DriverError, FilterError};
pub use filter::Filter;
