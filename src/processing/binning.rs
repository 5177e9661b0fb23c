//! Supervised discretization behind the processor contract.
//!
//! The actual binning algorithm sits behind [`BinningSolver`]: given the
//! flattened feature values paired with labels it must return a
//! [`FittedBins`] whose bins are sorted by the natural order of their
//! representative value. The shipped default is a quantile-edge solver; any
//! supervised discretizer satisfying the contract can be substituted.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};
use crate::processing::processor::{check_fit_block, ChainOffsets, Processor};
use crate::processing::registry::ProcessorConfig;
use crate::types::ColumnType;

/// Solver configuration derived from the label values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinningTask {
    /// Float labels
    Continuous,
    /// Integral labels with two classes
    Binary,
    /// Integral labels with more than two classes
    Multiclass,
}

impl BinningTask {
    /// Inspect the label column the way the solver-selection matrix does:
    /// non-integral labels mean a continuous target, otherwise the class
    /// count decides binary vs multiclass.
    pub fn from_labels(labels: &[f64]) -> Self {
        let integral = labels
            .iter()
            .filter(|v| v.is_finite())
            .all(|v| (v - v.round()).abs() < 1e-9);
        if !integral {
            return BinningTask::Continuous;
        }
        let max = labels.iter().copied().filter(|v| v.is_finite()).fold(f64::MIN, f64::max);
        if max <= 1.0 {
            BinningTask::Binary
        } else {
            BinningTask::Multiclass
        }
    }
}

/// Fitted discretization, serializable so the processor cache contract
/// holds regardless of which solver produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedBins {
    /// Ascending interior edges over a numeric feature; a value's bin index
    /// is the number of edges strictly below it
    Edges(Vec<f64>),
    /// One bin per category code, ascending
    Codes(Vec<i64>),
}

impl FittedBins {
    pub fn n_bins(&self) -> usize {
        match self {
            FittedBins::Edges(edges) => edges.len() + 1,
            FittedBins::Codes(codes) => codes.len(),
        }
    }

    /// Bin index of one value, always within `0..n_bins`
    pub fn bin_index(&self, value: f64) -> usize {
        match self {
            FittedBins::Edges(edges) => edges.iter().take_while(|&&e| value > e).count(),
            FittedBins::Codes(codes) => {
                let code = value.round() as i64;
                match codes.binary_search(&code) {
                    Ok(pos) => pos,
                    // Unseen codes collapse into the nearest bin
                    Err(pos) => pos.min(codes.len().saturating_sub(1)),
                }
            }
        }
    }
}

/// Pluggable supervised discretization strategy
pub trait BinningSolver {
    fn fit(
        &self,
        values: &[f64],
        labels: &[f64],
        task: BinningTask,
        feature_type: ColumnType,
    ) -> Result<FittedBins>;
}

/// Default solver: quantile edges for numeric features, one bin per code
/// for categorical ones. Labels select the task configuration and validate
/// pairing but do not move the edges.
#[derive(Debug, Clone)]
pub struct QuantileSolver {
    pub max_bins: usize,
}

impl Default for QuantileSolver {
    fn default() -> Self {
        Self { max_bins: 8 }
    }
}

impl BinningSolver for QuantileSolver {
    fn fit(
        &self,
        values: &[f64],
        labels: &[f64],
        _task: BinningTask,
        feature_type: ColumnType,
    ) -> Result<FittedBins> {
        if values.len() != labels.len() {
            return Err(PrepError::Data(format!(
                "binning received {} values but {} labels",
                values.len(),
                labels.len()
            )));
        }
        if feature_type == ColumnType::Numerical {
            let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
            if sorted.is_empty() {
                return Err(PrepError::InvalidData(
                    "binning cannot fit an all-missing feature".to_string(),
                ));
            }
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let mut edges = Vec::with_capacity(self.max_bins - 1);
            for k in 1..self.max_bins {
                let pos = (k * sorted.len()) / self.max_bins;
                let edge = sorted[pos.min(sorted.len() - 1)];
                if edges.last().map_or(true, |&last| edge > last) && edge > sorted[0] {
                    edges.push(edge);
                }
            }
            Ok(FittedBins::Edges(edges))
        } else {
            let mut codes: Vec<i64> = values
                .iter()
                .filter(|v| v.is_finite())
                .map(|v| v.round() as i64)
                .collect();
            codes.sort_unstable();
            codes.dedup();
            if codes.is_empty() {
                return Err(PrepError::InvalidData(
                    "binning cannot fit an all-missing feature".to_string(),
                ));
            }
            Ok(FittedBins::Codes(codes))
        }
    }
}

/// Cache record for [`OptBinningProcessor`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinningCaches {
    bins: FittedBins,
    task: BinningTask,
}

/// 1→B supervised binning: discretize via the solver, then expand the bin
/// index into B indicator columns so the chain width matches the number of
/// discovered bins.
pub struct OptBinningProcessor {
    offsets: ChainOffsets,
    labels: Option<Vec<f64>>,
    feature_type: ColumnType,
    solver: Box<dyn BinningSolver>,
    caches: Option<BinningCaches>,
}

impl OptBinningProcessor {
    pub fn new(offsets: ChainOffsets, config: &ProcessorConfig) -> Self {
        let max_bins = config
            .options
            .get("max_bins")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(8);
        Self {
            offsets,
            labels: config.labels.clone(),
            feature_type: config.feature_type.unwrap_or(ColumnType::Numerical),
            solver: Box::new(QuantileSolver { max_bins }),
            caches: None,
        }
    }

    /// Substitute a different discretization strategy.
    pub fn with_solver(mut self, solver: Box<dyn BinningSolver>) -> Self {
        self.solver = solver;
        self
    }
}

impl Processor for OptBinningProcessor {
    fn identifier(&self) -> &'static str {
        "opt_binning"
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn output_dim(&self) -> usize {
        self.caches.as_ref().map(|c| c.bins.n_bins()).unwrap_or(0)
    }

    fn is_fitted(&self) -> bool {
        self.caches.is_some()
    }

    fn offsets(&self) -> ChainOffsets {
        self.offsets
    }

    fn fit(&mut self, columns: ArrayView2<'_, f64>) -> Result<()> {
        check_fit_block(self.identifier(), &columns, self.input_dim())?;
        let labels = self.labels.as_ref().ok_or_else(|| {
            PrepError::Config("'opt_binning' requires labels at construction".to_string())
        })?;
        let values: Vec<f64> = columns.column(0).to_vec();
        let task = BinningTask::from_labels(labels);
        let bins = self.solver.fit(&values, labels, task, self.feature_type)?;
        self.caches = Some(BinningCaches { bins, task });
        Ok(())
    }

    fn process(&self, columns: &Array2<f64>) -> Result<Array2<f64>> {
        let caches = self
            .caches
            .as_ref()
            .ok_or(PrepError::NotFitted("OptBinningProcessor::process"))?;
        let n_bins = caches.bins.n_bins();
        let mut out = Array2::<f64>::zeros((columns.nrows(), n_bins));
        for (row, &value) in columns.column(0).iter().enumerate() {
            out[[row, caches.bins.bin_index(value)]] = 1.0;
        }
        Ok(out)
    }

    fn dump_caches(&self) -> Result<serde_json::Value> {
        let caches = self
            .caches
            .as_ref()
            .ok_or(PrepError::NotFitted("OptBinningProcessor::dump_caches"))?;
        Ok(serde_json::to_value(caches)?)
    }

    fn load_caches(&mut self, caches: serde_json::Value) -> Result<()> {
        self.caches = Some(serde_json::from_value(caches)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn config_with_labels(labels: Vec<f64>) -> ProcessorConfig {
        ProcessorConfig {
            labels: Some(labels),
            feature_type: Some(ColumnType::Numerical),
            ..ProcessorConfig::default()
        }
    }

    #[test]
    fn test_task_from_labels() {
        assert_eq!(BinningTask::from_labels(&[0.0, 1.0, 0.0]), BinningTask::Binary);
        assert_eq!(BinningTask::from_labels(&[0.0, 2.0, 1.0]), BinningTask::Multiclass);
        assert_eq!(BinningTask::from_labels(&[0.5, 1.2]), BinningTask::Continuous);
    }

    #[test]
    fn test_edges_bin_index() {
        let bins = FittedBins::Edges(vec![1.0, 2.0]);
        assert_eq!(bins.n_bins(), 3);
        assert_eq!(bins.bin_index(0.5), 0);
        assert_eq!(bins.bin_index(1.0), 0);
        assert_eq!(bins.bin_index(1.5), 1);
        assert_eq!(bins.bin_index(9.0), 2);
    }

    #[test]
    fn test_codes_bin_index() {
        let bins = FittedBins::Codes(vec![0, 2, 5]);
        assert_eq!(bins.bin_index(2.0), 1);
        assert_eq!(bins.bin_index(5.0), 2);
        // Unseen codes land in the nearest bin
        assert_eq!(bins.bin_index(9.0), 2);
    }

    #[test]
    fn test_binning_processor_fit_process() {
        let labels: Vec<f64> = (0..8).map(|i| (i % 2) as f64).collect();
        let config = config_with_labels(labels);
        let mut p = OptBinningProcessor::new(ChainOffsets::default(), &config);
        let block = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        p.fit(block.view()).unwrap();
        let out = p.process(&block).unwrap();
        assert_eq!(out.ncols(), p.output_dim());
        // Exactly one indicator fires per row
        for row in out.rows() {
            assert_eq!(row.iter().filter(|&&v| v == 1.0).count(), 1);
        }
    }

    #[test]
    fn test_binning_requires_labels() {
        let mut p = OptBinningProcessor::new(ChainOffsets::default(), &ProcessorConfig::default());
        assert!(matches!(
            p.fit(array![[1.0], [2.0]].view()),
            Err(PrepError::Config(_))
        ));
    }

    #[test]
    fn test_bins_sorted_by_representative_value() {
        let solver = QuantileSolver::default();
        let values = vec![5.0, 1.0, 3.0, 2.0, 4.0, 6.0, 8.0, 7.0];
        let labels = vec![0.0; 8];
        let bins = solver
            .fit(&values, &labels, BinningTask::Binary, ColumnType::Numerical)
            .unwrap();
        match bins {
            FittedBins::Edges(edges) => {
                assert!(edges.windows(2).all(|w| w[0] < w[1]));
            }
            _ => panic!("expected numeric edges"),
        }
    }
}
