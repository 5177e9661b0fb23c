//! The processor contract and chain offset bookkeeping.
//!
//! A processor is a fitted transform over a contiguous block of converted
//! columns. Chains are built left to right; each processor is handed the
//! ordered slice of processors placed before it purely to compute where its
//! input and output blocks sit, so downstream code can locate a processor's
//! slice inside a matrix whose width changes as transforms expand or
//! contract columns.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};

/// Absolute column offsets of a processor inside the chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainOffsets {
    /// Sum of `input_dim` over all preceding processors
    pub input_start: usize,
    /// Sum of `output_dim` over all preceding processors
    pub output_start: usize,
}

impl ChainOffsets {
    /// Offsets for a processor appended after `preceding`. Every preceding
    /// processor must already be fitted, otherwise its output width is not
    /// yet known.
    pub fn after(preceding: &[Box<dyn Processor>]) -> Result<Self> {
        for p in preceding {
            if !p.is_fitted() {
                return Err(PrepError::NotFitted("ChainOffsets::after"));
            }
        }
        Ok(Self {
            input_start: preceding.iter().map(|p| p.input_dim()).sum(),
            output_start: preceding.iter().map(|p| p.output_dim()).sum(),
        })
    }
}

/// Serialized form of a fitted processor: its registry identifier plus its
/// cache fields. Back-references to preceding processors are excluded and
/// supplied externally at reconstruction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorDump {
    pub identifier: String,
    pub caches: serde_json::Value,
}

/// A named, registrable transform over a contiguous block of converted
/// columns.
///
/// Lifecycle: constructed with its chain offsets, `fit` once against its
/// input block, then `process` / `recover` repeatedly. After fitting the
/// only mutation is cache population via `load_caches`.
pub trait Processor {
    /// Registry key of this processor type
    fn identifier(&self) -> &'static str;

    /// Width of the input block, fixed per concrete type
    fn input_dim(&self) -> usize;

    /// Width of the output block. For expanding transforms this is only
    /// meaningful once the processor is fitted.
    fn output_dim(&self) -> usize;

    fn is_fitted(&self) -> bool;

    fn offsets(&self) -> ChainOffsets;

    /// Absolute columns this processor reads from the converted matrix
    fn input_indices(&self) -> std::ops::Range<usize> {
        let start = self.offsets().input_start;
        start..start + self.input_dim()
    }

    /// Absolute columns this processor writes in the processed matrix
    fn output_indices(&self) -> std::ops::Range<usize> {
        let start = self.offsets().output_start;
        start..start + self.output_dim()
    }

    /// Compute and cache the statistics `process` / `recover` need from the
    /// given block (rows x `input_dim`). Never mutates the caller's data.
    fn fit(&mut self, columns: ArrayView2<'_, f64>) -> Result<()>;

    /// Map an input block to an output block, operating on a private copy.
    fn process(&self, columns: &Array2<f64>) -> Result<Array2<f64>>;

    /// Map an input block in place. Only dimension-preserving processors
    /// can support this.
    fn process_inplace(&self, columns: &mut Array2<f64>) -> Result<()> {
        let _ = columns;
        Err(PrepError::NotSupported(format!(
            "'{}' cannot process in place",
            self.identifier()
        )))
    }

    /// Inverse of `process` where defined. Required for label processors,
    /// optional for feature processors.
    fn recover(&self, columns: &Array2<f64>) -> Result<Array2<f64>> {
        let _ = columns;
        Err(PrepError::NotSupported(format!(
            "'{}' cannot recover original values",
            self.identifier()
        )))
    }

    /// In-place variant of `recover`.
    fn recover_inplace(&self, columns: &mut Array2<f64>) -> Result<()> {
        let _ = columns;
        Err(PrepError::NotSupported(format!(
            "'{}' cannot recover in place",
            self.identifier()
        )))
    }

    /// Serialize the fitted caches (excluding chain back-references).
    fn dump_caches(&self) -> Result<serde_json::Value>;

    /// Restore fitted caches produced by `dump_caches`.
    fn load_caches(&mut self, caches: serde_json::Value) -> Result<()>;

    /// Decompose into a reconstructible value; see [`ProcessorDump`].
    fn dump(&self) -> Result<ProcessorDump> {
        Ok(ProcessorDump {
            identifier: self.identifier().to_string(),
            caches: self.dump_caches()?,
        })
    }
}

/// Shared fit-input validation: a block must be non-empty, match the
/// declared width, and contain at least one finite value per column.
pub(crate) fn check_fit_block(
    identifier: &str,
    columns: &ArrayView2<'_, f64>,
    input_dim: usize,
) -> Result<()> {
    if columns.nrows() == 0 {
        return Err(PrepError::InvalidData(format!(
            "'{identifier}' cannot fit an empty column block"
        )));
    }
    if columns.ncols() != input_dim {
        return Err(PrepError::Data(format!(
            "'{identifier}' expects {input_dim} column(s), got {}",
            columns.ncols()
        )));
    }
    for col in columns.columns() {
        if col.iter().all(|v| !v.is_finite()) {
            return Err(PrepError::InvalidData(format!(
                "'{identifier}' cannot fit an all-missing column"
            )));
        }
    }
    Ok(())
}
