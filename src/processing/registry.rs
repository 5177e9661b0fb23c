//! Name-keyed processor registry.
//!
//! The orchestrator selects processors purely by string identifier, so new
//! transforms plug in without touching it: register a factory under a fresh
//! name and point a column's process method at it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};
use crate::processing::binning::OptBinningProcessor;
use crate::processing::processor::{ChainOffsets, Processor, ProcessorDump};
use crate::processing::transforms::{IdenticalProcessor, NormalizeProcessor, OneHotProcessor};
use crate::types::ColumnType;

/// Opaque construction options handed to processor factories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Free-form per-processor options (e.g. `max_bins`)
    pub options: serde_json::Map<String, serde_json::Value>,
    /// Flattened converted labels, required by supervised processors
    pub labels: Option<Vec<f64>>,
    /// Recognized type of the column feeding the processor
    pub feature_type: Option<ColumnType>,
}

/// Constructor for one processor type
pub type ProcessorFactory = fn(ChainOffsets, &ProcessorConfig) -> Result<Box<dyn Processor>>;

/// `name -> constructor` table for processor selection by string key
pub struct ProcessorRegistry {
    table: HashMap<String, ProcessorFactory>,
}

fn make_identical(offsets: ChainOffsets, _config: &ProcessorConfig) -> Result<Box<dyn Processor>> {
    Ok(Box::new(IdenticalProcessor::new(offsets)))
}

fn make_normalize(offsets: ChainOffsets, _config: &ProcessorConfig) -> Result<Box<dyn Processor>> {
    Ok(Box::new(NormalizeProcessor::new(offsets)))
}

fn make_one_hot(offsets: ChainOffsets, _config: &ProcessorConfig) -> Result<Box<dyn Processor>> {
    Ok(Box::new(OneHotProcessor::new(offsets)))
}

fn make_opt_binning(offsets: ChainOffsets, config: &ProcessorConfig) -> Result<Box<dyn Processor>> {
    Ok(Box::new(OptBinningProcessor::new(offsets, config)))
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        let mut registry = Self { table: HashMap::new() };
        registry.register("identical", make_identical);
        registry.register("normalize", make_normalize);
        registry.register("one_hot", make_one_hot);
        registry.register("opt_binning", make_opt_binning);
        registry
    }
}

impl ProcessorRegistry {
    /// Register a factory under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: ProcessorFactory) {
        self.table.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Construct an unfitted processor appended after `preceding`.
    pub fn make(
        &self,
        name: &str,
        preceding: &[Box<dyn Processor>],
        config: &ProcessorConfig,
    ) -> Result<Box<dyn Processor>> {
        let factory = self.table.get(name).ok_or_else(|| {
            PrepError::Config(format!("unknown processor method '{name}'"))
        })?;
        let offsets = ChainOffsets::after(preceding)?;
        factory(offsets, config)
    }

    /// Reconstruct a fitted processor from its dump plus the live preceding
    /// list.
    pub fn rebuild(
        &self,
        dump: &ProcessorDump,
        preceding: &[Box<dyn Processor>],
        config: &ProcessorConfig,
    ) -> Result<Box<dyn Processor>> {
        let mut processor = self.make(&dump.identifier, preceding, config)?;
        processor.load_caches(dump.caches.clone())?;
        Ok(processor)
    }
}
