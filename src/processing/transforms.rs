//! Built-in column transforms: identity, z-score normalization, one-hot
//! expansion.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};
use crate::processing::processor::{check_fit_block, ChainOffsets, Processor};

/// 1→1 passthrough, used for columns that should stay as converted
#[derive(Debug, Clone)]
pub struct IdenticalProcessor {
    offsets: ChainOffsets,
    is_fitted: bool,
}

/// Cache record for [`IdenticalProcessor`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdenticalCaches {
    is_fitted: bool,
}

impl IdenticalProcessor {
    pub fn new(offsets: ChainOffsets) -> Self {
        Self { offsets, is_fitted: false }
    }
}

impl Processor for IdenticalProcessor {
    fn identifier(&self) -> &'static str {
        "identical"
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn output_dim(&self) -> usize {
        1
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn offsets(&self) -> ChainOffsets {
        self.offsets
    }

    fn fit(&mut self, columns: ArrayView2<'_, f64>) -> Result<()> {
        check_fit_block(self.identifier(), &columns, self.input_dim())?;
        self.is_fitted = true;
        Ok(())
    }

    fn process(&self, columns: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrepError::NotFitted("IdenticalProcessor::process"));
        }
        Ok(columns.clone())
    }

    fn process_inplace(&self, _columns: &mut Array2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(PrepError::NotFitted("IdenticalProcessor::process_inplace"));
        }
        Ok(())
    }

    fn recover(&self, columns: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrepError::NotFitted("IdenticalProcessor::recover"));
        }
        Ok(columns.clone())
    }

    fn recover_inplace(&self, _columns: &mut Array2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(PrepError::NotFitted("IdenticalProcessor::recover_inplace"));
        }
        Ok(())
    }

    fn dump_caches(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(IdenticalCaches { is_fitted: self.is_fitted })?)
    }

    fn load_caches(&mut self, caches: serde_json::Value) -> Result<()> {
        let caches: IdenticalCaches = serde_json::from_value(caches)?;
        self.is_fitted = caches.is_fitted;
        Ok(())
    }
}

/// 1→1 z-score normalization: `(x - mean) / std`
#[derive(Debug, Clone)]
pub struct NormalizeProcessor {
    offsets: ChainOffsets,
    caches: Option<NormalizeCaches>,
}

/// Cache record for [`NormalizeProcessor`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NormalizeCaches {
    mean: f64,
    std: f64,
}

impl NormalizeProcessor {
    pub fn new(offsets: ChainOffsets) -> Self {
        Self { offsets, caches: None }
    }

    fn fitted(&self, op: &'static str) -> Result<&NormalizeCaches> {
        self.caches.as_ref().ok_or(PrepError::NotFitted(op))
    }
}

impl Processor for NormalizeProcessor {
    fn identifier(&self) -> &'static str {
        "normalize"
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn output_dim(&self) -> usize {
        1
    }

    fn is_fitted(&self) -> bool {
        self.caches.is_some()
    }

    fn offsets(&self) -> ChainOffsets {
        self.offsets
    }

    fn fit(&mut self, columns: ArrayView2<'_, f64>) -> Result<()> {
        check_fit_block(self.identifier(), &columns, self.input_dim())?;
        let values: Vec<f64> = columns.column(0).iter().copied().filter(|v| v.is_finite()).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        self.caches = Some(NormalizeCaches {
            mean,
            std: if std == 0.0 { 1.0 } else { std },
        });
        Ok(())
    }

    fn process(&self, columns: &Array2<f64>) -> Result<Array2<f64>> {
        let caches = self.fitted("NormalizeProcessor::process")?;
        Ok(columns.mapv(|v| (v - caches.mean) / caches.std))
    }

    fn process_inplace(&self, columns: &mut Array2<f64>) -> Result<()> {
        let caches = self.fitted("NormalizeProcessor::process_inplace")?;
        columns.mapv_inplace(|v| (v - caches.mean) / caches.std);
        Ok(())
    }

    fn recover(&self, columns: &Array2<f64>) -> Result<Array2<f64>> {
        let caches = self.fitted("NormalizeProcessor::recover")?;
        Ok(columns.mapv(|v| v * caches.std + caches.mean))
    }

    fn recover_inplace(&self, columns: &mut Array2<f64>) -> Result<()> {
        let caches = self.fitted("NormalizeProcessor::recover_inplace")?;
        columns.mapv_inplace(|v| v * caches.std + caches.mean);
        Ok(())
    }

    fn dump_caches(&self) -> Result<serde_json::Value> {
        let caches = self.fitted("NormalizeProcessor::dump_caches")?;
        Ok(serde_json::to_value(caches)?)
    }

    fn load_caches(&mut self, caches: serde_json::Value) -> Result<()> {
        self.caches = Some(serde_json::from_value(caches)?);
        Ok(())
    }
}

/// 1→K one-hot expansion over the category codes observed during `fit`.
///
/// Codes unseen at fit time process to an all-zero row; recovery is a
/// capability gap by design.
#[derive(Debug, Clone)]
pub struct OneHotProcessor {
    offsets: ChainOffsets,
    caches: Option<OneHotCaches>,
}

/// Cache record for [`OneHotProcessor`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OneHotCaches {
    /// Distinct category codes in ascending order
    categories: Vec<i64>,
}

impl OneHotProcessor {
    pub fn new(offsets: ChainOffsets) -> Self {
        Self { offsets, caches: None }
    }
}

impl Processor for OneHotProcessor {
    fn identifier(&self) -> &'static str {
        "one_hot"
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn output_dim(&self) -> usize {
        self.caches.as_ref().map(|c| c.categories.len()).unwrap_or(0)
    }

    fn is_fitted(&self) -> bool {
        self.caches.is_some()
    }

    fn offsets(&self) -> ChainOffsets {
        self.offsets
    }

    fn fit(&mut self, columns: ArrayView2<'_, f64>) -> Result<()> {
        check_fit_block(self.identifier(), &columns, self.input_dim())?;
        let mut categories: Vec<i64> = columns
            .column(0)
            .iter()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64)
            .collect();
        categories.sort_unstable();
        categories.dedup();
        self.caches = Some(OneHotCaches { categories });
        Ok(())
    }

    fn process(&self, columns: &Array2<f64>) -> Result<Array2<f64>> {
        let caches = self
            .caches
            .as_ref()
            .ok_or(PrepError::NotFitted("OneHotProcessor::process"))?;
        let n_rows = columns.nrows();
        let k = caches.categories.len();
        let mut out = Array2::<f64>::zeros((n_rows, k));
        for (row, value) in columns.column(0).iter().enumerate() {
            let code = value.round() as i64;
            if let Ok(pos) = caches.categories.binary_search(&code) {
                out[[row, pos]] = 1.0;
            }
        }
        Ok(out)
    }

    fn dump_caches(&self) -> Result<serde_json::Value> {
        let caches = self
            .caches
            .as_ref()
            .ok_or(PrepError::NotFitted("OneHotProcessor::dump_caches"))?;
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
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_identical_round_trip() {
        let mut p = IdenticalProcessor::new(ChainOffsets::default());
        let block = array![[1.0], [2.0], [3.0]];
        p.fit(block.view()).unwrap();
        let out = p.process(&block).unwrap();
        assert_eq!(out, block);
        assert_eq!(p.recover(&out).unwrap(), block);
    }

    #[test]
    fn test_normalize_zero_mean_unit_std() {
        let mut p = NormalizeProcessor::new(ChainOffsets::default());
        let block = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        p.fit(block.view()).unwrap();
        let out = p.process(&block).unwrap();
        let mean: f64 = out.column(0).iter().sum::<f64>() / 5.0;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_recover_round_trip() {
        let mut p = NormalizeProcessor::new(ChainOffsets::default());
        let block = array![[10.0], [20.0], [30.0]];
        p.fit(block.view()).unwrap();
        let recovered = p.recover(&p.process(&block).unwrap()).unwrap();
        for (a, b) in block.iter().zip(recovered.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_normalize_constant_column() {
        let mut p = NormalizeProcessor::new(ChainOffsets::default());
        let block = array![[7.0], [7.0], [7.0]];
        p.fit(block.view()).unwrap();
        let out = p.process(&block).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalize_before_fit() {
        let p = NormalizeProcessor::new(ChainOffsets::default());
        assert!(matches!(
            p.process(&array![[1.0]]),
            Err(PrepError::NotFitted(_))
        ));
    }

    #[test]
    fn test_one_hot_expansion() {
        let mut p = OneHotProcessor::new(ChainOffsets::default());
        let block = array![[0.0], [2.0], [1.0], [0.0]];
        p.fit(block.view()).unwrap();
        assert_eq!(p.output_dim(), 3);
        let out = p.process(&block).unwrap();
        assert_eq!(
            out,
            array![
                [1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0],
                [1.0, 0.0, 0.0]
            ]
        );
    }

    #[test]
    fn test_one_hot_unseen_code_is_zero_row() {
        let mut p = OneHotProcessor::new(ChainOffsets::default());
        p.fit(array![[0.0], [1.0]].view()).unwrap();
        let out = p.process(&array![[5.0]]).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_one_hot_recover_not_supported() {
        let mut p = OneHotProcessor::new(ChainOffsets::default());
        p.fit(array![[0.0], [1.0]].view()).unwrap();
        assert!(matches!(
            p.recover(&array![[1.0, 0.0]]),
            Err(PrepError::NotSupported(_))
        ));
        assert!(matches!(
            p.process_inplace(&mut array![[0.0]]),
            Err(PrepError::NotSupported(_))
        ));
    }

    #[test]
    fn test_dump_and_load_caches() {
        let mut p = NormalizeProcessor::new(ChainOffsets::default());
        p.fit(array![[1.0], [3.0]].view()).unwrap();
        let dumped = p.dump_caches().unwrap();
        let mut restored = NormalizeProcessor::new(ChainOffsets::default());
        restored.load_caches(dumped).unwrap();
        assert!(restored.is_fitted());
        let out = restored.process(&array![[2.0]]).unwrap();
        assert_eq!(out, array![[0.0]]);
    }
}
