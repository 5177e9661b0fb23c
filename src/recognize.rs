//! Column recognition: decide whether a raw column is valid and whether it
//! is numerical, categorical or free-form string data.
//!
//! The recognizer is a collaborator of the pipeline: the orchestrator only
//! depends on its contract (`fit` on a flat string column producing a
//! [`FeatureInfo`]), so callers can swap in stronger heuristics without
//! touching the rest of the kernel.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{ColumnType, FeatureInfo, FlatColumn};

/// Entries treated as missing in raw columns
pub(crate) fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan")
}

/// Options steering recognition for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeOptions {
    pub force_string: bool,
    pub force_numerical: bool,
    pub force_categorical: bool,
    /// Suppress invalidation entirely (always applied to labels)
    pub force_valid: bool,
    /// Minimum fraction of parseable entries for a column to count as
    /// numerical
    pub numerical_threshold: f64,
    pub is_label: bool,
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self {
            force_string: false,
            force_numerical: false,
            force_categorical: false,
            force_valid: false,
            numerical_threshold: 0.5,
            is_label: false,
        }
    }
}

impl RecognizeOptions {
    /// Options used for label columns: every entry must parse for the label
    /// to be numerical, and labels are never excluded.
    pub fn for_label() -> Self {
        Self {
            force_valid: true,
            numerical_threshold: 1.0,
            is_label: true,
            ..Self::default()
        }
    }
}

/// Column recognizer
#[derive(Debug, Clone)]
pub struct Recognizer {
    name: String,
    options: RecognizeOptions,
}

impl Recognizer {
    pub fn new(name: impl Into<String>, options: RecognizeOptions) -> Self {
        Self { name: name.into(), options }
    }

    /// Classify one flat raw column.
    pub fn fit(&self, flat_arr: &[String]) -> FeatureInfo {
        let n = flat_arr.len();
        let parsed: Vec<f64> = flat_arr
            .iter()
            .map(|v| {
                if is_missing(v) {
                    f64::NAN
                } else {
                    v.trim().parse::<f64>().unwrap_or(f64::NAN)
                }
            })
            .collect();
        let n_missing = flat_arr.iter().filter(|v| is_missing(v)).count();
        let n_numeric = parsed.iter().filter(|v| v.is_finite()).count();
        let n_present = n - n_missing;

        if n_present == 0 {
            return self.invalid("all values are missing", flat_arr);
        }

        let unique: HashSet<&str> =
            flat_arr.iter().filter(|v| !is_missing(v)).map(|v| v.as_str()).collect();
        if unique.len() == 1 && !self.options.is_label {
            return self.invalid("all values are identical", flat_arr);
        }

        let column_type = self.decide_type(n_present, n_numeric, unique.len());
        match column_type {
            ColumnType::Numerical => FeatureInfo {
                name: self.name.clone(),
                column_type,
                is_valid: true,
                msg: None,
                flat_arr: FlatColumn::Numerical(parsed),
            },
            ColumnType::Categorical | ColumnType::String => {
                // Identifier-like columns carry no signal
                if unique.len() == n && n > 1 && !self.options.force_valid {
                    return self.invalid("all values are distinct", flat_arr);
                }
                FeatureInfo {
                    name: self.name.clone(),
                    column_type,
                    is_valid: true,
                    msg: None,
                    flat_arr: FlatColumn::Strings(self.normalized(flat_arr)),
                }
            }
        }
    }

    fn decide_type(&self, n_present: usize, n_numeric: usize, _n_unique: usize) -> ColumnType {
        let opts = &self.options;
        if opts.force_numerical {
            return ColumnType::Numerical;
        }
        if opts.force_string {
            return ColumnType::String;
        }
        if opts.force_categorical {
            return ColumnType::Categorical;
        }
        let numeric_ratio = n_numeric as f64 / n_present as f64;
        if numeric_ratio >= opts.numerical_threshold {
            ColumnType::Numerical
        } else {
            ColumnType::Categorical
        }
    }

    fn invalid(&self, reason: &str, flat_arr: &[String]) -> FeatureInfo {
        if self.options.force_valid {
            // A forced column falls back to categorical over the raw strings
            return FeatureInfo {
                name: self.name.clone(),
                column_type: if self.options.force_numerical {
                    ColumnType::Numerical
                } else {
                    ColumnType::Categorical
                },
                is_valid: true,
                msg: None,
                flat_arr: if self.options.force_numerical {
                    FlatColumn::Numerical(
                        flat_arr
                            .iter()
                            .map(|v| v.trim().parse::<f64>().unwrap_or(f64::NAN))
                            .collect(),
                    )
                } else {
                    FlatColumn::Strings(self.normalized(flat_arr))
                },
            };
        }
        FeatureInfo {
            name: self.name.clone(),
            column_type: ColumnType::String,
            is_valid: false,
            msg: Some(format!("column '{}' is invalid: {}", self.name, reason)),
            flat_arr: FlatColumn::Strings(self.normalized(flat_arr)),
        }
    }

    fn normalized(&self, flat_arr: &[String]) -> Vec<String> {
        flat_arr
            .iter()
            .map(|v| if is_missing(v) { "nan".to_string() } else { v.clone() })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numerical_column() {
        let info = Recognizer::new("a", RecognizeOptions::default())
            .fit(&strings(&["1.5", "2.5", "", "4.0"]));
        assert!(info.is_valid);
        assert_eq!(info.column_type, ColumnType::Numerical);
        match info.flat_arr {
            FlatColumn::Numerical(v) => {
                assert_eq!(v[0], 1.5);
                assert!(v[2].is_nan());
            }
            _ => panic!("expected numerical column"),
        }
    }

    #[test]
    fn test_categorical_column() {
        let info = Recognizer::new("c", RecognizeOptions::default())
            .fit(&strings(&["red", "blue", "red", "green", "blue"]));
        assert!(info.is_valid);
        assert_eq!(info.column_type, ColumnType::Categorical);
    }

    #[test]
    fn test_constant_column_invalid() {
        let info = Recognizer::new("c", RecognizeOptions::default())
            .fit(&strings(&["x", "x", "x"]));
        assert!(!info.is_valid);
        assert!(info.msg.unwrap().contains("identical"));
    }

    #[test]
    fn test_all_distinct_strings_invalid() {
        let info = Recognizer::new("id", RecognizeOptions::default())
            .fit(&strings(&["u1", "u2", "u3", "u4"]));
        assert!(!info.is_valid);
    }

    #[test]
    fn test_all_missing_invalid() {
        let info = Recognizer::new("m", RecognizeOptions::default())
            .fit(&strings(&["", "nan", ""]));
        assert!(!info.is_valid);
    }

    #[test]
    fn test_force_valid_overrides() {
        let options = RecognizeOptions { force_valid: true, ..Default::default() };
        let info = Recognizer::new("c", options).fit(&strings(&["x", "x", "x"]));
        assert!(info.is_valid);
    }

    #[test]
    fn test_label_options() {
        let info = Recognizer::new("label", RecognizeOptions::for_label())
            .fit(&strings(&["0", "1", "0", "cat"]));
        // One unparseable entry breaks the 1.0 threshold
        assert_eq!(info.column_type, ColumnType::Categorical);
        assert!(info.is_valid);
    }

    #[test]
    fn test_force_numerical() {
        let options = RecognizeOptions { force_numerical: true, ..Default::default() };
        let info = Recognizer::new("n", options).fit(&strings(&["1", "2", "x"]));
        assert_eq!(info.column_type, ColumnType::Numerical);
    }
}
