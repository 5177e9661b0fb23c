//! Processor chain framework
//!
//! Provides the composable column-block transform pipeline:
//! - The [`Processor`] contract with chain offset bookkeeping
//! - Built-in transforms (identity, normalize, one-hot)
//! - Supervised binning behind a pluggable solver seam
//! - A name-keyed registry for string-selected, extensible transforms

mod processor;
mod registry;
pub mod binning;
pub mod transforms;

pub use processor::{ChainOffsets, Processor, ProcessorDump};
pub use registry::{ProcessorConfig, ProcessorFactory, ProcessorRegistry};
pub use binning::{BinningSolver, BinningTask, FittedBins, OptBinningProcessor, QuantileSolver};
pub use transforms::{IdenticalProcessor, NormalizeProcessor, OneHotProcessor};
