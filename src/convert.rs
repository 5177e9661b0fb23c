//! Raw value conversion: map recognized columns into numeric form and back.
//!
//! Numerical columns pass through with missing entries filled by the fitted
//! mean; categorical and string columns are mapped onto category codes over
//! the sorted unique fitted values. Both directions are bijective on the
//! fitted domain, which is what label recovery relies on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};
use crate::types::{ColumnType, FeatureInfo, FlatColumn};

/// Fitted raw→numeric converter for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Converter {
    Numerical {
        /// Fill value for missing entries, the mean of the fitted values
        nan_fill: f64,
    },
    Categorical {
        /// Category values in code order
        values: Vec<String>,
        /// Code assigned to values unseen during fit
        fallback: f64,
    },
}

impl Converter {
    /// Fit a converter from a recognized column.
    pub fn fit(info: &FeatureInfo) -> Result<Self> {
        if !info.is_valid {
            return Err(PrepError::InvalidData(format!(
                "cannot convert invalid column '{}'",
                info.name
            )));
        }
        match (&info.flat_arr, info.column_type) {
            (FlatColumn::Numerical(values), _) => {
                let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                if finite.is_empty() {
                    return Err(PrepError::InvalidData(format!(
                        "column '{}' has no finite values",
                        info.name
                    )));
                }
                let nan_fill = finite.iter().sum::<f64>() / finite.len() as f64;
                Ok(Converter::Numerical { nan_fill })
            }
            (FlatColumn::Strings(values), _) => {
                let mut unique: Vec<String> = values.to_vec();
                unique.sort();
                unique.dedup();
                if unique.is_empty() {
                    return Err(PrepError::InvalidData(format!(
                        "column '{}' is empty",
                        info.name
                    )));
                }
                // Most frequent fitted value absorbs categories unseen at
                // transform time
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for v in values {
                    *counts.entry(v.as_str()).or_insert(0) += 1;
                }
                let most_frequent = unique
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, v)| counts.get(v.as_str()).copied().unwrap_or(0))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                Ok(Converter::Categorical {
                    values: unique,
                    fallback: most_frequent as f64,
                })
            }
        }
    }

    /// Convert a flat raw column into its numeric encoding.
    pub fn convert(&self, flat_arr: &FlatColumn) -> Result<Vec<f64>> {
        match (self, flat_arr) {
            (Converter::Numerical { nan_fill }, FlatColumn::Numerical(values)) => Ok(values
                .iter()
                .map(|&v| if v.is_finite() { v } else { *nan_fill })
                .collect()),
            (Converter::Categorical { values, fallback }, FlatColumn::Strings(raw)) => {
                let codes: HashMap<&str, f64> = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (v.as_str(), i as f64))
                    .collect();
                Ok(raw
                    .iter()
                    .map(|v| codes.get(v.as_str()).copied().unwrap_or(*fallback))
                    .collect())
            }
            _ => Err(PrepError::Data(
                "column kind does not match the fitted converter".to_string(),
            )),
        }
    }

    /// Recover original values from their numeric encoding.
    pub fn recover(&self, encoded: &[f64]) -> FlatColumn {
        match self {
            Converter::Numerical { .. } => FlatColumn::Numerical(encoded.to_vec()),
            Converter::Categorical { values, .. } => FlatColumn::Strings(
                encoded
                    .iter()
                    .map(|&code| {
                        let idx = (code.round().max(0.0) as usize).min(values.len() - 1);
                        values[idx].clone()
                    })
                    .collect(),
            ),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Converter::Numerical { .. } => ColumnType::Numerical,
            Converter::Categorical { .. } => ColumnType::Categorical,
        }
    }
}
