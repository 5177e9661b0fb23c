//! Pipeline orchestration: recognize raw columns, convert them to numeric
//! form, run the processor chain, and expose splitting and label recovery
//! over the fitted snapshots.
//!
//! [`TabularData`] is the entry point of the crate. `read` fits the whole
//! pipeline against raw string rows; `transform` replays the fitted
//! pipeline on new rows without refitting; `split` partitions all three
//! snapshots (raw, converted, processed) consistently by row index.

use std::collections::{BTreeSet, HashMap, HashSet};

use ndarray::{concatenate, s, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::convert::Converter;
use crate::error::{PrepError, Result};
use crate::processing::{Processor, ProcessorConfig, ProcessorDump, ProcessorRegistry};
use crate::recognize::{is_missing, RecognizeOptions, Recognizer};
use crate::split::{DataSplitter, SplitSize, SplitterConfig};
use crate::types::{ColumnType, DataTuple, FlatColumn, RawTuple, TabularDataset, TaskType};

/// Pipeline construction options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularConfig {
    /// Override the task kind instead of deriving it from the labels
    pub task_type: Option<TaskType>,
    /// Columns recognized as free-form strings regardless of content
    pub string_columns: HashSet<usize>,
    /// Columns recognized as numerical regardless of content
    pub numerical_columns: HashSet<usize>,
    /// Columns recognized as categorical regardless of content
    pub categorical_columns: HashSet<usize>,
    /// Columns that must never be excluded
    pub valid_columns: HashSet<usize>,
    /// Minimum fraction of parseable entries for a column to count as
    /// numerical
    pub numerical_threshold: f64,
    /// Per-column processor selection. `None` leaves every column
    /// untouched (`identical`); entries missing from a provided map
    /// resolve to `auto`.
    pub process_methods: Option<HashMap<usize, String>>,
    /// Processor applied to the label column; `None` picks `normalize`
    /// for numerical labels and `identical` otherwise
    pub label_process_method: Option<String>,
    /// Processor substituted for `auto` on numerical columns
    pub default_numerical_process: String,
    /// Processor substituted for `auto` on categorical columns
    pub default_categorical_process: String,
    pub column_names: Option<Vec<String>>,
    /// Name given to the label column in recognition output
    pub label_name: String,
    /// Free-form options forwarded to processor factories
    pub processor_options: serde_json::Map<String, serde_json::Value>,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            task_type: None,
            string_columns: HashSet::new(),
            numerical_columns: HashSet::new(),
            categorical_columns: HashSet::new(),
            valid_columns: HashSet::new(),
            numerical_threshold: 0.5,
            process_methods: None,
            label_process_method: None,
            default_numerical_process: "normalize".to_string(),
            default_categorical_process: "one_hot".to_string(),
            column_names: None,
            label_name: "label".to_string(),
            processor_options: serde_json::Map::new(),
        }
    }
}

impl TabularConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    pub fn with_string_columns(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.string_columns = columns.into_iter().collect();
        self
    }

    pub fn with_numerical_columns(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.numerical_columns = columns.into_iter().collect();
        self
    }

    pub fn with_categorical_columns(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.categorical_columns = columns.into_iter().collect();
        self
    }

    pub fn with_valid_columns(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.valid_columns = columns.into_iter().collect();
        self
    }

    pub fn with_numerical_threshold(mut self, threshold: f64) -> Self {
        self.numerical_threshold = threshold;
        self
    }

    pub fn with_process_methods(
        mut self,
        methods: impl IntoIterator<Item = (usize, String)>,
    ) -> Self {
        self.process_methods = Some(methods.into_iter().collect());
        self
    }

    pub fn with_label_process_method(mut self, method: impl Into<String>) -> Self {
        self.label_process_method = Some(method.into());
        self
    }

    pub fn with_column_names(mut self, names: Vec<String>) -> Self {
        self.column_names = Some(names);
        self
    }

    pub fn with_label_name(mut self, name: impl Into<String>) -> Self {
        self.label_name = name.into();
        self
    }

    pub fn with_processor_option(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.processor_options.insert(key.into(), value);
        self
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.numerical_threshold) || self.numerical_threshold == 0.0 {
            return Err(PrepError::Config(format!(
                "numerical_threshold must be in (0, 1], got {}",
                self.numerical_threshold
            )));
        }
        let sets = [
            &self.string_columns,
            &self.numerical_columns,
            &self.categorical_columns,
        ];
        for (i, a) in sets.iter().enumerate() {
            for b in sets.iter().skip(i + 1) {
                if let Some(overlap) = a.intersection(b).next() {
                    return Err(PrepError::Config(format!(
                        "column {overlap} is forced to more than one type"
                    )));
                }
            }
        }
        Ok(())
    }

    fn column_name(&self, idx: usize) -> String {
        self.column_names
            .as_ref()
            .and_then(|names| names.get(idx).cloned())
            .unwrap_or_else(|| format!("c{idx}"))
    }
}

/// One side of a pipeline split: all three snapshots restricted to the
/// same row indices
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub raw: RawTuple,
    pub converted: DataTuple,
    pub processed: DataTuple,
    pub indices: Vec<usize>,
}

/// Serialized form of a fitted pipeline. Data snapshots are not included;
/// a loaded pipeline transforms new rows but holds no rows of its own.
#[derive(Serialize, Deserialize)]
struct PipelineDump {
    config: TabularConfig,
    task_type: Option<TaskType>,
    excludes: Vec<usize>,
    converters: Vec<Option<Converter>>,
    processors: Vec<ProcessorDump>,
    label_converter: Option<Converter>,
    label_processor: Option<ProcessorDump>,
}

/// The fitted preprocessing pipeline
pub struct TabularData {
    config: TabularConfig,
    registry: ProcessorRegistry,
    is_fitted: bool,
    raw_dim: usize,
    task_type: Option<TaskType>,
    /// Raw columns rejected by recognition, never converted or processed
    excludes: BTreeSet<usize>,
    /// Per raw column; `None` for excluded columns
    converters: Vec<Option<Converter>>,
    processors: Vec<Box<dyn Processor>>,
    label_converter: Option<Converter>,
    label_processor: Option<Box<dyn Processor>>,
    raw: Option<RawTuple>,
    converted: Option<DataTuple>,
    processed: Option<DataTuple>,
}

impl TabularData {
    pub fn new(config: TabularConfig) -> Self {
        Self::with_registry(config, ProcessorRegistry::default())
    }

    /// Use a registry extended with custom processors.
    pub fn with_registry(config: TabularConfig, registry: ProcessorRegistry) -> Self {
        Self {
            config,
            registry,
            is_fitted: false,
            raw_dim: 0,
            task_type: None,
            excludes: BTreeSet::new(),
            converters: Vec::new(),
            processors: Vec::new(),
            label_converter: None,
            label_processor: None,
            raw: None,
            converted: None,
            processed: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Number of raw feature columns seen at fit time
    pub fn raw_dim(&self) -> usize {
        self.raw_dim
    }

    /// Width of the processed feature matrix
    pub fn processed_dim(&self) -> usize {
        self.processors.iter().map(|p| p.output_dim()).sum()
    }

    /// Raw column indices rejected during recognition
    pub fn excludes(&self) -> &BTreeSet<usize> {
        &self.excludes
    }

    /// Fitted feature processors in chain order
    pub fn processors(&self) -> &[Box<dyn Processor>] {
        &self.processors
    }

    pub fn task_type(&self) -> Result<TaskType> {
        self.task_type.ok_or(PrepError::NotFitted("TabularData::task_type"))
    }

    /// Number of label classes; `None` for regression tasks
    pub fn num_classes(&self) -> Option<usize> {
        match (&self.task_type, &self.label_converter) {
            (Some(TaskType::Classification), Some(Converter::Categorical { values, .. })) => {
                Some(values.len())
            }
            _ => None,
        }
    }

    pub fn raw(&self) -> Result<&RawTuple> {
        self.raw.as_ref().ok_or(PrepError::NotFitted("TabularData::raw"))
    }

    pub fn converted(&self) -> Result<&DataTuple> {
        self.converted.as_ref().ok_or(PrepError::NotFitted("TabularData::converted"))
    }

    pub fn processed(&self) -> Result<&DataTuple> {
        self.processed.as_ref().ok_or(PrepError::NotFitted("TabularData::processed"))
    }

    /// Fit the whole pipeline on raw string rows and keep the raw,
    /// converted and processed snapshots.
    pub fn read(&mut self, x: Vec<Vec<String>>, y: Option<Vec<String>>) -> Result<&mut Self> {
        self.config.validate()?;
        let raw = RawTuple::new(x, y);
        let n_rows = raw.n_rows();
        let n_cols = raw.n_cols();
        if n_rows == 0 || n_cols == 0 {
            return Err(PrepError::InvalidData("cannot read an empty dataset".to_string()));
        }
        if raw.x.iter().any(|row| row.len() != n_cols) {
            return Err(PrepError::Data("rows have inconsistent widths".to_string()));
        }
        if let Some(y) = &raw.y {
            if y.len() != n_rows {
                return Err(PrepError::Data(format!(
                    "{} rows but {} labels",
                    n_rows,
                    y.len()
                )));
            }
        }

        self.excludes.clear();
        self.converters.clear();
        self.processors.clear();
        self.raw_dim = n_cols;

        // Recognize and convert features
        let mut converted_columns: Vec<Vec<f64>> = Vec::with_capacity(n_cols);
        for idx in 0..n_cols {
            let mut options = RecognizeOptions {
                force_string: self.config.string_columns.contains(&idx),
                force_numerical: self.config.numerical_columns.contains(&idx),
                force_categorical: self.config.categorical_columns.contains(&idx),
                force_valid: self.config.valid_columns.contains(&idx),
                numerical_threshold: self.config.numerical_threshold,
                is_label: false,
            };
            if idx == n_cols - 1 && self.excludes.len() == idx {
                warn!(
                    "every column before the last was excluded; forcing column {idx} to be valid"
                );
                options.force_valid = true;
            }
            let info =
                Recognizer::new(self.config.column_name(idx), options).fit(&raw.column(idx));
            if !info.is_valid {
                warn!(column = idx, reason = info.msg.as_deref().unwrap_or(""), "column excluded");
                self.excludes.insert(idx);
                self.converters.push(None);
                continue;
            }
            let converter = Converter::fit(&info)?;
            converted_columns.push(converter.convert(&info.flat_arr)?);
            self.converters.push(Some(converter));
        }

        // Recognize and convert labels
        let mut converted_labels: Option<Vec<f64>> = None;
        if let Some(y) = &raw.y {
            let mut options = RecognizeOptions::for_label();
            match self.config.task_type {
                Some(TaskType::Classification) => options.force_categorical = true,
                Some(TaskType::Regression) => options.force_numerical = true,
                None => {}
            }
            let info = Recognizer::new(self.config.label_name.clone(), options).fit(y);
            let task_type = self
                .config
                .task_type
                .unwrap_or_else(|| TaskType::from_column_type(info.column_type));
            self.task_type = Some(task_type);
            let converter = Converter::fit(&info)?;
            let mut labels = converter.convert(&info.flat_arr)?;
            if task_type.is_classification() {
                for v in labels.iter_mut() {
                    *v = v.round();
                }
            }
            self.label_converter = Some(converter);
            converted_labels = Some(labels);
        } else {
            self.task_type = Some(self.config.task_type.unwrap_or(TaskType::Regression));
            self.label_converter = None;
        }

        let converted_x = columns_to_matrix(n_rows, &converted_columns);
        let converted_y = converted_labels
            .as_ref()
            .map(|labels| Array2::from_shape_vec((n_rows, 1), labels.clone()))
            .transpose()?;

        // Build and fit the processor chain over the valid columns. Each
        // placed processor consumes `input_dim` raw columns; excluded
        // columns are stepped over without consuming a processor slot.
        let mut processed_blocks: Vec<Array2<f64>> = Vec::new();
        let mut idx = 0;
        while idx < n_cols {
            let converter = match &self.converters[idx] {
                Some(converter) => converter,
                None => {
                    idx += 1;
                    continue;
                }
            };
            let method = self.resolve_method(idx, converter.column_type());
            let config = ProcessorConfig {
                options: self.config.processor_options.clone(),
                labels: converted_labels.clone(),
                feature_type: Some(converter.column_type()),
            };
            let mut processor = self.registry.make(&method, &self.processors, &config)?;
            let input_range = processor.input_indices();
            if input_range.end > converted_x.ncols() {
                return Err(PrepError::Data(format!(
                    "processor '{method}' reads converted columns {input_range:?} but only {} exist",
                    converted_x.ncols()
                )));
            }
            let input = converted_x.slice(s![.., input_range]).to_owned();
            processor.fit(input.view())?;
            processed_blocks.push(processor.process(&input)?);
            idx += processor.input_dim().max(1);
            self.processors.push(processor);
        }
        let processed_x = if processed_blocks.is_empty() {
            Array2::<f64>::zeros((n_rows, 0))
        } else {
            let views: Vec<_> = processed_blocks.iter().map(|b| b.view()).collect();
            concatenate(Axis(1), &views)?
        };

        // Fit the label processor
        let processed_y = match (&converted_y, &self.label_converter) {
            (Some(y), Some(converter)) => {
                let method = self.config.label_process_method.clone().unwrap_or_else(|| {
                    if converter.column_type() == ColumnType::Numerical {
                        "normalize".to_string()
                    } else {
                        "identical".to_string()
                    }
                });
                let config = ProcessorConfig {
                    feature_type: Some(converter.column_type()),
                    ..ProcessorConfig::default()
                };
                let mut processor = self.registry.make(&method, &[], &config)?;
                processor.fit(y.view())?;
                let processed = processor.process(y)?;
                self.label_processor = Some(processor);
                Some(processed)
            }
            _ => {
                self.label_processor = None;
                None
            }
        };

        self.raw = Some(raw);
        self.converted = Some(DataTuple::new(converted_x, converted_y));
        self.processed = Some(DataTuple::new(processed_x, processed_y));
        self.is_fitted = true;
        Ok(self)
    }

    fn resolve_method(&self, idx: usize, column_type: ColumnType) -> String {
        let method = match &self.config.process_methods {
            None => "identical".to_string(),
            Some(map) => map.get(&idx).cloned().unwrap_or_else(|| "auto".to_string()),
        };
        if method == "auto" {
            if column_type == ColumnType::Numerical {
                self.config.default_numerical_process.clone()
            } else {
                self.config.default_categorical_process.clone()
            }
        } else {
            method
        }
    }

    /// Replay the fitted pipeline on new raw rows, producing the converted
    /// and processed snapshots without refitting anything.
    pub fn transform(
        &self,
        x: &[Vec<String>],
        y: Option<&[String]>,
    ) -> Result<(DataTuple, DataTuple)> {
        if !self.is_fitted {
            return Err(PrepError::NotFitted("TabularData::transform"));
        }
        let n_rows = x.len();
        if x.iter().any(|row| row.len() != self.raw_dim) {
            return Err(PrepError::Data(format!(
                "transform expects rows of width {}",
                self.raw_dim
            )));
        }

        let mut converted_columns: Vec<Vec<f64>> = Vec::new();
        for (idx, converter) in self.converters.iter().enumerate() {
            let converter = match converter {
                Some(converter) => converter,
                None => continue,
            };
            let column: Vec<String> = x.iter().map(|row| row[idx].clone()).collect();
            converted_columns.push(converter.convert(&flat_for(converter, &column))?);
        }
        let converted_x = columns_to_matrix(n_rows, &converted_columns);

        let converted_y = match (y, &self.label_converter) {
            (Some(y), Some(converter)) => {
                let mut labels = converter.convert(&flat_for(converter, y))?;
                if self.task_type == Some(TaskType::Classification) {
                    for v in labels.iter_mut() {
                        *v = v.round();
                    }
                }
                Some(Array2::from_shape_vec((n_rows, 1), labels)?)
            }
            (Some(_), None) => {
                return Err(PrepError::Data(
                    "labels were given but the pipeline was fitted without labels".to_string(),
                ))
            }
            _ => None,
        };

        let mut processed_blocks: Vec<Array2<f64>> = Vec::with_capacity(self.processors.len());
        for processor in &self.processors {
            let input = converted_x
                .slice(s![.., processor.input_indices()])
                .to_owned();
            processed_blocks.push(processor.process(&input)?);
        }
        let processed_x = if processed_blocks.is_empty() {
            Array2::<f64>::zeros((n_rows, 0))
        } else {
            let views: Vec<_> = processed_blocks.iter().map(|b| b.view()).collect();
            concatenate(Axis(1), &views)?
        };
        let processed_y = match (&converted_y, &self.label_processor) {
            (Some(y), Some(processor)) => Some(processor.process(y)?),
            _ => None,
        };

        Ok((
            DataTuple::new(converted_x, converted_y),
            DataTuple::new(processed_x, processed_y),
        ))
    }

    /// Map processed labels back to their original raw representation.
    pub fn recover_labels(&self, y: &Array2<f64>) -> Result<FlatColumn> {
        let processor = self
            .label_processor
            .as_ref()
            .ok_or(PrepError::NotFitted("TabularData::recover_labels"))?;
        let converter = self
            .label_converter
            .as_ref()
            .ok_or(PrepError::NotFitted("TabularData::recover_labels"))?;
        let recovered = processor.recover(y)?;
        Ok(converter.recover(&recovered.column(0).to_vec()))
    }

    /// Partition the fitted snapshots into a drawn subset and the
    /// remainder, stratified or grouped according to the task kind. The
    /// draw respects storage order; shuffling is left to the caller's
    /// splitter if wanted.
    pub fn split(&self, size: SplitSize) -> Result<(DataSplit, DataSplit)> {
        let raw = self.raw()?;
        let converted = self.converted()?;
        let processed = self.processed()?;
        let task_type = self.task_type()?;

        let dataset =
            TabularDataset::new(processed.x.clone(), processed.y.clone(), task_type);
        let mut splitter = DataSplitter::new(SplitterConfig::new().with_shuffle(false))?;
        splitter.fit(dataset)?;
        let result = splitter.split(size)?;

        let take = |indices: &[usize]| DataSplit {
            raw: raw.select(indices),
            converted: converted.select(indices),
            processed: processed.select(indices),
            indices: indices.to_vec(),
        };
        Ok((
            take(&result.corresponding_indices),
            take(&result.remaining_indices),
        ))
    }

    /// Serialize the fitted pipeline (converters, processor caches,
    /// exclusion set). Snapshots are not serialized.
    pub fn dumps(&self) -> Result<String> {
        if !self.is_fitted {
            return Err(PrepError::NotFitted("TabularData::dumps"));
        }
        let dump = PipelineDump {
            config: self.config.clone(),
            task_type: self.task_type,
            excludes: self.excludes.iter().copied().collect(),
            converters: self.converters.clone(),
            processors: self
                .processors
                .iter()
                .map(|p| p.dump())
                .collect::<Result<Vec<_>>>()?,
            label_converter: self.label_converter.clone(),
            label_processor: self.label_processor.as_ref().map(|p| p.dump()).transpose()?,
        };
        Ok(serde_json::to_string(&dump)?)
    }

    /// Reconstruct a fitted pipeline from [`dumps`](Self::dumps) output.
    /// The loaded pipeline transforms and recovers but holds no snapshots.
    pub fn loads(serialized: &str, registry: ProcessorRegistry) -> Result<Self> {
        let dump: PipelineDump = serde_json::from_str(serialized)?;
        let mut pipeline = Self::with_registry(dump.config, registry);
        pipeline.task_type = dump.task_type;
        pipeline.excludes = dump.excludes.into_iter().collect();
        pipeline.converters = dump.converters;
        pipeline.raw_dim = pipeline.converters.len();

        let valid_types: Vec<ColumnType> = pipeline
            .converters
            .iter()
            .flatten()
            .map(|c| c.column_type())
            .collect();
        if dump.processors.len() != valid_types.len() {
            return Err(PrepError::Data(format!(
                "dump holds {} processors for {} valid columns",
                dump.processors.len(),
                valid_types.len()
            )));
        }
        for (processor_dump, column_type) in dump.processors.iter().zip(valid_types) {
            let config = ProcessorConfig {
                feature_type: Some(column_type),
                ..ProcessorConfig::default()
            };
            let processor =
                pipeline
                    .registry
                    .rebuild(processor_dump, &pipeline.processors, &config)?;
            pipeline.processors.push(processor);
        }
        pipeline.label_converter = dump.label_converter;
        pipeline.label_processor = dump
            .label_processor
            .as_ref()
            .map(|processor_dump| {
                let config = ProcessorConfig {
                    feature_type: pipeline.label_converter.as_ref().map(|c| c.column_type()),
                    ..ProcessorConfig::default()
                };
                pipeline.registry.rebuild(processor_dump, &[], &config)
            })
            .transpose()?;
        pipeline.is_fitted = true;
        Ok(pipeline)
    }
}

/// Reinterpret a raw string column through a fitted converter's kind.
fn flat_for(converter: &Converter, column: &[String]) -> FlatColumn {
    match converter {
        Converter::Numerical { .. } => FlatColumn::Numerical(
            column
                .iter()
                .map(|v| {
                    if is_missing(v) {
                        f64::NAN
                    } else {
                        v.trim().parse::<f64>().unwrap_or(f64::NAN)
                    }
                })
                .collect(),
        ),
        Converter::Categorical { .. } => FlatColumn::Strings(
            column
                .iter()
                .map(|v| if is_missing(v) { "nan".to_string() } else { v.clone() })
                .collect(),
        ),
    }
}

fn columns_to_matrix(n_rows: usize, columns: &[Vec<f64>]) -> Array2<f64> {
    let mut matrix = Array2::<f64>::zeros((n_rows, columns.len()));
    for (c, column) in columns.iter().enumerate() {
        for (r, &v) in column.iter().enumerate() {
            matrix[[r, c]] = v;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    fn labels(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    fn simple_rows() -> Vec<Vec<String>> {
        rows(&[
            &["1.0", "red"],
            &["2.0", "blue"],
            &["3.0", "red"],
            &["4.0", "green"],
        ])
    }

    #[test]
    fn test_read_fits_pipeline() {
        let mut data = TabularData::new(TabularConfig::new());
        data.read(simple_rows(), labels(&["a", "b", "a", "b"])).unwrap();
        assert!(data.is_fitted());
        assert_eq!(data.raw_dim(), 2);
        assert_eq!(data.task_type().unwrap(), TaskType::Classification);
        assert_eq!(data.num_classes(), Some(2));
        // No process methods configured: every column stays identical
        assert_eq!(data.processed_dim(), 2);
        assert!(data.excludes().is_empty());
    }

    #[test]
    fn test_auto_process_methods() {
        let config = TabularConfig::new().with_process_methods(Vec::<(usize, String)>::new());
        let mut data = TabularData::new(config);
        data.read(simple_rows(), labels(&["a", "b", "a", "b"])).unwrap();
        // normalize keeps 1 column, one_hot expands to 3 categories
        assert_eq!(data.processed_dim(), 4);
    }

    #[test]
    fn test_invalid_column_excluded() {
        let mut data = TabularData::new(TabularConfig::new());
        data.read(
            rows(&[
                &["1.0", "x"],
                &["2.0", "x"],
                &["3.0", "x"],
            ]),
            None,
        )
        .unwrap();
        assert_eq!(data.excludes().iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(data.processed_dim(), 1);
    }

    #[test]
    fn test_last_column_forced_valid() {
        // Both columns are constant; the second is forced valid so the
        // pipeline never ends up empty.
        let mut data = TabularData::new(TabularConfig::new());
        data.read(rows(&[&["x", "y"], &["x", "y"], &["x", "y"]]), None).unwrap();
        assert_eq!(data.excludes().iter().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(data.processed_dim(), 1);
    }

    #[test]
    fn test_transform_matches_read() {
        let config = TabularConfig::new().with_process_methods(Vec::<(usize, String)>::new());
        let mut data = TabularData::new(config);
        let x = simple_rows();
        let y = labels(&["a", "b", "a", "b"]);
        data.read(x.clone(), y.clone()).unwrap();
        let (converted, processed) = data.transform(&x, y.as_deref()).unwrap();
        assert_eq!(&converted.x, &data.converted().unwrap().x);
        assert_eq!(&processed.x, &data.processed().unwrap().x);
        assert_eq!(
            processed.y.as_ref().unwrap(),
            data.processed().unwrap().y.as_ref().unwrap()
        );
    }

    #[test]
    fn test_transform_before_read() {
        let data = TabularData::new(TabularConfig::new());
        assert!(matches!(
            data.transform(&rows(&[&["1"]]), None),
            Err(PrepError::NotFitted(_))
        ));
    }

    #[test]
    fn test_recover_labels_round_trip() {
        let mut data = TabularData::new(TabularConfig::new());
        let y = labels(&["cat", "dog", "cat", "bird"]);
        data.read(simple_rows(), y.clone()).unwrap();
        let processed_y = data.processed().unwrap().y.clone().unwrap();
        match data.recover_labels(&processed_y).unwrap() {
            FlatColumn::Strings(recovered) => assert_eq!(recovered, y.unwrap()),
            _ => panic!("expected string labels"),
        }
    }

    #[test]
    fn test_split_partitions_all_snapshots() {
        let mut data = TabularData::new(TabularConfig::new());
        let x = rows(&[
            &["1.0", "a"],
            &["2.0", "b"],
            &["3.0", "a"],
            &["4.0", "b"],
            &["5.0", "a"],
            &["6.0", "b"],
        ]);
        data.read(x, labels(&["0", "1", "0", "1", "0", "1"])).unwrap();
        let (picked, remained) = data.split(SplitSize::Count(2)).unwrap();
        assert_eq!(picked.indices.len(), 2);
        assert_eq!(remained.indices.len(), 4);
        assert_eq!(picked.raw.n_rows(), 2);
        assert_eq!(picked.converted.n_rows(), 2);
        assert_eq!(picked.processed.n_rows(), 2);
        for idx in &picked.indices {
            assert!(!remained.indices.contains(idx));
        }
    }

    #[test]
    fn test_dumps_loads_transform_equivalence() {
        let config = TabularConfig::new().with_process_methods(Vec::<(usize, String)>::new());
        let mut data = TabularData::new(config);
        let x = simple_rows();
        let y = labels(&["a", "b", "a", "b"]);
        data.read(x.clone(), y.clone()).unwrap();

        let serialized = data.dumps().unwrap();
        let loaded = TabularData::loads(&serialized, ProcessorRegistry::default()).unwrap();
        assert!(loaded.is_fitted());
        assert!(loaded.processed().is_err()); // no snapshots after loads

        let (_, processed) = data.transform(&x, y.as_deref()).unwrap();
        let (_, processed_loaded) = loaded.transform(&x, y.as_deref()).unwrap();
        assert_eq!(processed.x, processed_loaded.x);
        assert_eq!(processed.y, processed_loaded.y);
    }

    #[test]
    fn test_overlapping_force_sets_rejected() {
        let config = TabularConfig::new()
            .with_string_columns([0])
            .with_numerical_columns([0]);
        let mut data = TabularData::new(config);
        assert!(matches!(
            data.read(rows(&[&["1"], &["2"]]), None),
            Err(PrepError::Config(_))
        ));
    }

    #[test]
    fn test_regression_label_normalized() {
        let config = TabularConfig::new();
        let mut data = TabularData::new(config);
        data.read(
            rows(&[&["1.0", "a"], &["2.0", "b"], &["3.0", "a"], &["4.0", "b"]]),
            labels(&["10.0", "20.0", "30.0", "40.0"]),
        )
        .unwrap();
        assert_eq!(data.task_type().unwrap(), TaskType::Regression);
        assert!(data.num_classes().is_none());
        let processed_y = data.processed().unwrap().y.as_ref().unwrap().clone();
        let mean: f64 = processed_y.iter().sum::<f64>() / processed_y.len() as f64;
        assert!(mean.abs() < 1e-9); // z-scored labels
        match data.recover_labels(&processed_y).unwrap() {
            FlatColumn::Numerical(recovered) => {
                for (r, expected) in recovered.iter().zip([10.0, 20.0, 30.0, 40.0]) {
                    assert!((r - expected).abs() < 1e-9);
                }
            }
            _ => panic!("expected numerical labels"),
        }
    }

    #[test]
    fn test_binning_process_method() {
        let config = TabularConfig::new()
            .with_process_methods([(0usize, "opt_binning".to_string())])
            .with_processor_option("max_bins", serde_json::json!(3));
        let mut data = TabularData::new(config);
        let x = rows(&[
            &["1.0", "a"],
            &["2.0", "b"],
            &["3.0", "a"],
            &["4.0", "b"],
            &["5.0", "a"],
            &["6.0", "b"],
        ]);
        data.read(x, labels(&["0", "1", "0", "1", "0", "1"])).unwrap();
        // Column 0 expands into its bin indicators, column 1 resolves to
        // auto -> one_hot over 2 categories
        assert!(data.processed_dim() > 2);
    }
}
