//! Core data model: column kinds, task kinds, and the raw / converted /
//! processed dataset snapshots.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Recognized kind of a raw column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numerical,
    Categorical,
    String,
}

/// Kind of learning task, derived from the label column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Regression,
    Classification,
}

impl TaskType {
    /// Numerical labels imply regression; categorical or string labels
    /// imply classification.
    pub fn from_column_type(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Numerical => TaskType::Regression,
            ColumnType::Categorical | ColumnType::String => TaskType::Classification,
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, TaskType::Classification)
    }

    pub fn is_regression(&self) -> bool {
        matches!(self, TaskType::Regression)
    }
}

/// One raw column after recognition. Missing numeric entries are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlatColumn {
    Numerical(Vec<f64>),
    Strings(Vec<String>),
}

impl FlatColumn {
    pub fn len(&self) -> usize {
        match self {
            FlatColumn::Numerical(v) => v.len(),
            FlatColumn::Strings(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable output of column recognition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub name: String,
    pub column_type: ColumnType,
    pub is_valid: bool,
    /// Reason the column was rejected, when `is_valid` is false
    pub msg: Option<String>,
    pub flat_arr: FlatColumn,
}

/// Raw string rows, pre-recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTuple {
    pub x: Vec<Vec<String>>,
    pub y: Option<Vec<String>>,
}

impl RawTuple {
    pub fn new(x: Vec<Vec<String>>, y: Option<Vec<String>>) -> Self {
        Self { x, y }
    }

    pub fn n_rows(&self) -> usize {
        self.x.len()
    }

    pub fn n_cols(&self) -> usize {
        self.x.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Column-major view of one raw column
    pub fn column(&self, idx: usize) -> Vec<String> {
        self.x.iter().map(|row| row[idx].clone()).collect()
    }

    /// Select rows by index, preserving the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: self
                .y
                .as_ref()
                .map(|y| indices.iter().map(|&i| y[i].clone()).collect()),
        }
    }
}

/// A converted or processed snapshot: numeric features plus optional labels.
/// Row `i` always refers to the same sample across all snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTuple {
    pub x: Array2<f64>,
    pub y: Option<Array2<f64>>,
}

impl DataTuple {
    pub fn new(x: Array2<f64>, y: Option<Array2<f64>>) -> Self {
        Self { x, y }
    }

    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// Select rows by index, preserving the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: self.y.as_ref().map(|y| y.select(Axis(0), indices)),
        }
    }
}

/// Fitted dataset handed to the [`DataSplitter`](crate::split::DataSplitter)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularDataset {
    pub x: Array2<f64>,
    pub y: Option<Array2<f64>>,
    pub task_type: TaskType,
    /// Feature column names, required for name-addressed time series columns
    pub column_names: Option<Vec<String>>,
}

impl TabularDataset {
    pub fn new(x: Array2<f64>, y: Option<Array2<f64>>, task_type: TaskType) -> Self {
        Self { x, y, task_type, column_names: None }
    }

    pub fn with_column_names(mut self, names: Vec<String>) -> Self {
        self.column_names = Some(names);
        self
    }

    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// Select rows by index, preserving the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: self.y.as_ref().map(|y| y.select(Axis(0), indices)),
            task_type: self.task_type,
            column_names: self.column_names.clone(),
        }
    }
}
