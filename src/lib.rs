//! # tabprep
//!
//! Tabular data preparation kernel: recognize raw string columns, convert
//! them to numeric form, run a composable processor chain over the
//! converted matrix, and sample train/test subsets with task-aware
//! splitting policies.
//!
//! The crate is organized around three cooperating subsystems:
//!
//! - **Processor chain** ([`processing`]): registrable column-block
//!   transforms with offset bookkeeping, so expanding transforms such as
//!   one-hot keep every downstream block addressable.
//! - **Dataset splitter** ([`split`]): index sampling over a fitted
//!   dataset with flat, stratified and time-series policies.
//! - **Pipeline orchestrator** ([`pipeline`]): ties recognition,
//!   conversion and processing together, with transform replay, label
//!   recovery, consistent splitting and serialization of the fitted
//!   state.
//!
//! ## Quick start
//!
//! ```no_run
//! use tabprep::{SplitSize, TabularConfig, TabularData};
//!
//! # fn main() -> tabprep::Result<()> {
//! let x = vec![
//!     vec!["1.5".to_string(), "red".to_string()],
//!     vec!["2.5".to_string(), "blue".to_string()],
//!     vec!["3.5".to_string(), "red".to_string()],
//! ];
//! let y = vec!["a".to_string(), "b".to_string(), "a".to_string()];
//!
//! let config = TabularConfig::new()
//!     .with_process_methods(Vec::<(usize, String)>::new()); // auto per column
//! let mut data = TabularData::new(config);
//! data.read(x, Some(y))?;
//!
//! let (test, train) = data.split(SplitSize::Fraction(0.25))?;
//! assert_eq!(test.processed.n_rows() + train.processed.n_rows(), 3);
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod recognize;
pub mod split;
pub mod types;

pub use convert::Converter;
pub use error::{PrepError, Result};
pub use pipeline::{DataSplit, TabularConfig, TabularData};
pub use processing::{
    BinningSolver, BinningTask, ChainOffsets, FittedBins, IdenticalProcessor, NormalizeProcessor,
    OneHotProcessor, OptBinningProcessor, Processor, ProcessorConfig, ProcessorDump,
    ProcessorFactory, ProcessorRegistry, QuantileSolver,
};
pub use recognize::{RecognizeOptions, Recognizer};
pub use split::{
    ColumnRef, DataSplitter, SplitResult, SplitSize, SplitterConfig, TimeSeriesConfig,
};
pub use types::{
    ColumnType, DataTuple, FeatureInfo, FlatColumn, RawTuple, TabularDataset, TaskType,
};
