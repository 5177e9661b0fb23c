//! Dataset splitting with per-task sampling policies.
//!
//! A [`DataSplitter`] draws successive target-size subsets from a pool of
//! remaining row indices. Regression draws from a flat pool, classification
//! stratifies draws to preserve label ratios, and time series consumes
//! whole recency-ordered groups. Pools are rebuilt by [`DataSplitter::reset`]
//! and mutated in place by every [`DataSplitter::split`].

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};
use crate::types::TabularDataset;

/// How a subset size is requested
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitSize {
    /// Absolute row count
    Count(usize),
    /// Fraction of the total row count, in (0, 1)
    Fraction(f64),
}

/// Reference to a feature column, by name or by position. The id and time
/// columns of one config must use the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRef {
    Name(String),
    Position(usize),
}

/// Time series configuration: which columns carry the series id and the
/// time value. Both are extracted and removed from the feature matrix at
/// fit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesConfig {
    pub id_column: ColumnRef,
    pub time_column: ColumnRef,
}

/// Splitter construction options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Shuffle pools on every `reset`
    pub shuffle: bool,
    /// Draw with replacement: pools are reshuffled instead of shrunk
    pub replace: bool,
    pub time_series: Option<TimeSeriesConfig>,
    /// Seed for the splitter's RNG. Shuffling (including the stratified
    /// rounding-correction tie-break) is non-deterministic unless set.
    pub random_state: Option<u64>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self { shuffle: true, replace: false, time_series: None, random_state: None }
    }
}

impl SplitterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn with_time_series(mut self, config: TimeSeriesConfig) -> Self {
        self.time_series = Some(config);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }
}

/// One drawn subset: the materialized rows, the drawn indices, and the
/// indices still in the pool afterwards
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub dataset: TabularDataset,
    pub corresponding_indices: Vec<usize>,
    pub remaining_indices: Vec<usize>,
}

/// Per-label pools for stratified draws
struct ClfState {
    /// Per-label index lists, labels ascending, built once and reused
    base_lists: Vec<Vec<usize>>,
    ratios: Vec<f64>,
    n_unique: usize,
    in_use: Vec<Vec<usize>>,
}

/// Per-time-group pools for temporal draws
struct TsState {
    /// Groups in reverse chronological order, built once and reused
    base_lists: Vec<Vec<usize>>,
    /// Cumulative group sizes over `base_lists`
    base_cumsum: Vec<usize>,
    in_use: Vec<Vec<usize>>,
    cumsum_in_use: Vec<usize>,
}

struct FittedState {
    dataset: TabularDataset,
    is_regression: bool,
    id_column: Option<Vec<f64>>,
    time_column: Option<Vec<f64>>,
    /// Permutation restoring time-ascending row order (time series only)
    sorting_indices: Option<Vec<usize>>,
    remained: Vec<usize>,
    clf: Option<ClfState>,
    ts: Option<TsState>,
}

/// Stateful index sampler over a fitted dataset
pub struct DataSplitter {
    shuffle: bool,
    replace: bool,
    time_series: Option<TimeSeriesConfig>,
    rng: ChaCha8Rng,
    state: Option<FittedState>,
}

/// Group `values` by equality: returns (unique values ascending, counts,
/// index lists), indices ascending within each group.
fn unique_indices(values: &[f64]) -> Result<(Vec<f64>, Vec<usize>, Vec<Vec<usize>>)> {
    if values.iter().any(|v| v.is_nan()) {
        return Err(PrepError::InvalidData(
            "cannot group rows on a column containing NaN".to_string(),
        ));
    }
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap().then(a.cmp(&b)));
    let mut unique = Vec::new();
    let mut counts = Vec::new();
    let mut lists: Vec<Vec<usize>> = Vec::new();
    for &idx in &order {
        if unique.last() != Some(&values[idx]) {
            unique.push(values[idx]);
            counts.push(0);
            lists.push(Vec::new());
        }
        *counts.last_mut().unwrap() += 1;
        lists.last_mut().unwrap().push(idx);
    }
    Ok((unique, counts, lists))
}

impl DataSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self> {
        if let Some(ts) = &config.time_series {
            if config.replace {
                return Err(PrepError::Config(
                    "`replace` cannot be true when splitting a time series dataset".to_string(),
                ));
            }
            let same_kind = matches!(
                (&ts.id_column, &ts.time_column),
                (ColumnRef::Name(_), ColumnRef::Name(_))
                    | (ColumnRef::Position(_), ColumnRef::Position(_))
            );
            if !same_kind {
                return Err(PrepError::Config(
                    "id_column and time_column must both be addressed by name or both by position"
                        .to_string(),
                ));
            }
        }
        let rng = match config.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            shuffle: config.shuffle,
            replace: config.replace,
            time_series: config.time_series,
            rng,
            state: None,
        })
    }

    pub fn is_time_series(&self) -> bool {
        self.time_series.is_some()
    }

    /// Capture the dataset and build the sampling pools. Implies `reset`.
    pub fn fit(&mut self, dataset: TabularDataset) -> Result<&mut Self> {
        let is_regression = dataset.task_type.is_regression();
        let mut dataset = dataset;
        let mut id_column = None;
        let mut time_column = None;
        if let Some(ts) = &self.time_series {
            let (id_pos, time_pos) = resolve_columns(&dataset, ts)?;
            id_column = Some(dataset.x.column(id_pos).to_vec());
            time_column = Some(dataset.x.column(time_pos).to_vec());
            dataset = drop_columns(dataset, id_pos, time_pos);
        } else if !is_regression && dataset.y.is_none() {
            return Err(PrepError::InvalidData(
                "classification splitting requires labels".to_string(),
            ));
        }
        self.state = Some(FittedState {
            dataset,
            is_regression,
            id_column,
            time_column,
            sorting_indices: None,
            remained: Vec::new(),
            clf: None,
            ts: None,
        });
        self.reset()?;
        Ok(self)
    }

    /// Rebuild the sampling pools, shuffling them when configured. Must be
    /// called (directly or via `fit`) before the first `split`.
    pub fn reset(&mut self) -> Result<&mut Self> {
        let state = self.state.as_mut().ok_or(PrepError::NotFitted("DataSplitter::reset"))?;
        if state.time_column.is_some() {
            Self::reset_time_series(state, self.shuffle, &mut self.rng)?;
        } else if state.is_regression {
            let n = state.dataset.n_rows();
            let mut remained: Vec<usize> = (0..n).collect();
            if self.shuffle {
                remained.shuffle(&mut self.rng);
            }
            state.remained = remained;
        } else {
            Self::reset_clf(state, self.shuffle, &mut self.rng)?;
        }
        Ok(self)
    }

    fn reset_clf(state: &mut FittedState, shuffle: bool, rng: &mut ChaCha8Rng) -> Result<()> {
        if state.clf.is_none() {
            let y = state.dataset.y.as_ref().ok_or_else(|| {
                PrepError::InvalidData("classification splitting requires labels".to_string())
            })?;
            let flat: Vec<f64> = y.iter().copied().collect();
            let (unique, counts, lists) = unique_indices(&flat)?;
            if unique.len() == 1 {
                return Err(PrepError::InvalidData(
                    "only 1 unique label is detected, which is invalid in classification tasks"
                        .to_string(),
                ));
            }
            let n_samples = flat.len() as f64;
            state.clf = Some(ClfState {
                ratios: counts.iter().map(|&c| c as f64 / n_samples).collect(),
                n_unique: unique.len(),
                base_lists: lists,
                in_use: Vec::new(),
            });
        }
        let clf = state.clf.as_mut().unwrap();
        if shuffle {
            for list in clf.base_lists.iter_mut() {
                list.shuffle(rng);
            }
        }
        clf.in_use = clf.base_lists.clone();
        state.remained = clf.in_use.concat();
        Ok(())
    }

    fn reset_time_series(
        state: &mut FittedState,
        shuffle: bool,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        if state.ts.is_none() {
            let time_column = state.time_column.as_ref().unwrap();
            let (_, counts, mut lists) = unique_indices(time_column)?;
            // Time-ascending concatenation restores the original order
            state.sorting_indices = Some(lists.concat());
            // Pools are kept most-recent first
            lists.reverse();
            let mut cumsum = Vec::with_capacity(counts.len());
            let mut acc = 0usize;
            for &c in counts.iter().rev() {
                acc += c;
                cumsum.push(acc);
            }
            debug_assert_eq!(acc, time_column.len());
            state.ts = Some(TsState {
                base_lists: lists,
                base_cumsum: cumsum,
                in_use: Vec::new(),
                cumsum_in_use: Vec::new(),
            });
        }
        let ts = state.ts.as_mut().unwrap();
        if shuffle {
            for list in ts.base_lists.iter_mut() {
                list.shuffle(rng);
            }
        }
        ts.in_use = ts.base_lists.clone();
        ts.cumsum_in_use = ts.base_cumsum.clone();
        state.remained = ts.in_use.concat();
        Ok(())
    }

    /// Remaining pool, most recently drawn end last
    pub fn remained_indices(&self) -> Result<Vec<usize>> {
        let state = self.state.as_ref().ok_or(PrepError::NotFitted("remained_indices"))?;
        Ok(state.remained.iter().rev().copied().collect())
    }

    /// Rows of the remaining pool
    pub fn remained_xy(&self) -> Result<(Array2<f64>, Option<Array2<f64>>)> {
        let state = self.state.as_ref().ok_or(PrepError::NotFitted("remained_xy"))?;
        let indices = self.remained_indices()?;
        let picked = state.dataset.select(&indices);
        Ok((picked.x, picked.y))
    }

    /// Permutation restoring time-ascending order; time series only.
    pub fn sorting_indices(&self) -> Result<&[usize]> {
        let state = self.state.as_ref().ok_or(PrepError::NotFitted("sorting_indices"))?;
        state
            .sorting_indices
            .as_deref()
            .ok_or_else(|| {
                PrepError::Config(
                    "sorting_indices is only available for time series splitting".to_string(),
                )
            })
    }

    /// Draw one subset of the requested size. Fractions are interpreted
    /// against the total row count; a request at or above the current pool
    /// size returns the entire remaining pool.
    pub fn split(&mut self, size: SplitSize) -> Result<SplitResult> {
        let n_total = self
            .state
            .as_ref()
            .ok_or(PrepError::NotFitted("DataSplitter::split"))?
            .dataset
            .n_rows();
        let n = match size {
            SplitSize::Count(c) => c,
            SplitSize::Fraction(f) => {
                if !(0.0..1.0).contains(&f) || f == 0.0 {
                    return Err(PrepError::Config(format!(
                        "split fraction must be in (0, 1), got {f}"
                    )));
                }
                (n_total as f64 * f).floor() as usize
            }
        };

        let is_time_series = self.is_time_series();
        let state = self.state.as_mut().unwrap();
        if state.remained.is_empty() && n > 0 {
            // Pool exhausted on a previous call
            return Ok(SplitResult {
                dataset: state.dataset.select(&[]),
                corresponding_indices: Vec::new(),
                remaining_indices: Vec::new(),
            });
        }
        if n >= state.remained.len() {
            let mut tgt = std::mem::take(&mut state.remained);
            if is_time_series {
                tgt.reverse();
            }
            if let Some(clf) = state.clf.as_mut() {
                clf.in_use.iter_mut().for_each(|l| l.clear());
            }
            if let Some(ts) = state.ts.as_mut() {
                ts.in_use.clear();
                ts.cumsum_in_use.clear();
            }
            return Ok(SplitResult {
                dataset: state.dataset.select(&tgt),
                corresponding_indices: tgt,
                remaining_indices: Vec::new(),
            });
        }

        let tgt = if is_time_series {
            Self::split_time_series(state, n)
        } else if state.is_regression {
            Self::split_reg(state, n, self.replace, &mut self.rng)
        } else {
            Self::split_clf(state, n, self.replace, &mut self.rng)?
        };
        if tgt.len() != n {
            return Err(PrepError::Data(format!(
                "split size invariant violated: requested {n}, drew {}",
                tgt.len()
            )));
        }
        Ok(SplitResult {
            dataset: state.dataset.select(&tgt),
            corresponding_indices: tgt,
            remaining_indices: state.remained.clone(),
        })
    }

    fn split_reg(
        state: &mut FittedState,
        n: usize,
        replace: bool,
        rng: &mut ChaCha8Rng,
    ) -> Vec<usize> {
        let len = state.remained.len();
        let tgt = state.remained[len - n..].to_vec();
        // Keep at least one index in the pool mid-sequence
        let n_drop = n.min(len - 1);
        if replace {
            state.remained.shuffle(rng);
        } else if n_drop > 0 {
            state.remained.truncate(len - n_drop);
        }
        tgt
    }

    fn split_clf(
        state: &mut FittedState,
        n: usize,
        replace: bool,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>> {
        let clf = state.clf.as_mut().ok_or(PrepError::NotFitted("DataSplitter::split"))?;
        if n < clf.n_unique {
            return Err(PrepError::InsufficientLabels { required: clf.n_unique, requested: n });
        }
        let mut per_label: Vec<i64> = clf
            .ratios
            .iter()
            .map(|&r| ((n as f64 * r).round() as i64).max(1))
            .collect();
        // Rounding leaves the sum off by at most the unique-label count;
        // correct it round-robin over a shuffled subset of labels.
        let mut excess: i64 = per_label.iter().sum::<i64>() - n as i64;
        if excess != 0 {
            let sign = excess.signum();
            excess = excess.abs();
            let mut chosen: Vec<usize> = (0..clf.n_unique).filter(|&i| per_label[i] != 1).collect();
            if chosen.is_empty() {
                chosen = (0..clf.n_unique).collect();
            }
            chosen.shuffle(rng);
            let n_chosen = chosen.len() as i64;
            let n_tile = (excess + n_chosen - 1) / n_chosen;
            let mut proceeded = 0i64;
            for _ in 0..n_tile - 1 {
                for &idx in &chosen {
                    per_label[idx] -= sign;
                }
                proceeded += n_chosen;
            }
            for &idx in chosen.iter().take((excess - proceeded) as usize) {
                per_label[idx] -= sign;
            }
        }
        debug_assert_eq!(per_label.iter().sum::<i64>(), n as i64);

        let mut tgt = Vec::with_capacity(n);
        let mut drops: Vec<usize> = Vec::with_capacity(clf.n_unique);
        for (pool, &k) in clf.in_use.iter().zip(per_label.iter()) {
            let k = (k.max(0) as usize).min(pool.len());
            let n_in_use = pool.len();
            tgt.extend_from_slice(&pool[n_in_use - k..]);
            // A draw that would leave fewer than two indices keeps the pool
            // intact; those indices may reappear in later draws.
            drops.push(if k + 1 >= n_in_use { 0 } else { k });
        }
        if replace {
            for pool in clf.in_use.iter_mut() {
                pool.shuffle(rng);
            }
        } else {
            for (pool, &k) in clf.in_use.iter_mut().zip(drops.iter()) {
                let keep = pool.len() - k;
                pool.truncate(keep);
            }
        }
        state.remained = clf.in_use.concat();
        Ok(tgt)
    }

    fn split_time_series(state: &mut FittedState, n: usize) -> Vec<usize> {
        let ts = state.ts.as_mut().expect("time series pools exist after reset");
        let split_arg = ts
            .cumsum_in_use
            .iter()
            .position(|&c| c >= n)
            .expect("split() guarantees n is below the pool size");
        let n_left = ts.cumsum_in_use[split_arg] - n;
        let mut selected: Vec<Vec<usize>>;
        let n_res;
        if split_arg == 0 {
            n_res = n;
            selected = Vec::new();
        } else {
            n_res = n - ts.cumsum_in_use[split_arg - 1];
            selected = ts.in_use.drain(..split_arg).collect();
            ts.cumsum_in_use.drain(..split_arg);
        }
        selected.push(ts.in_use[0][..n_res].to_vec());
        if n_left > 0 {
            ts.in_use[0].drain(..n_res);
        } else {
            ts.in_use.remove(0);
            ts.cumsum_in_use.remove(0);
        }
        for c in ts.cumsum_in_use.iter_mut() {
            *c -= n;
        }
        state.remained = ts.in_use.concat();
        let mut tgt = selected.concat();
        tgt.reverse();
        tgt
    }

    /// Draw several subsets in one call. Sizes must be either all absolute
    /// counts or all fractions; fraction lists allocate floored counts with
    /// the last fraction absorbing the rounding remainder, and the leftover
    /// pool is appended as a final subset.
    pub fn split_multiple(
        &mut self,
        sizes: &[SplitSize],
        return_remained: bool,
    ) -> Result<Vec<SplitResult>> {
        let n_total = self
            .state
            .as_ref()
            .ok_or(PrepError::NotFitted("DataSplitter::split_multiple"))?
            .dataset
            .n_rows();
        let any_fraction = sizes.iter().any(|s| matches!(s, SplitSize::Fraction(_)));
        let all_fractions = sizes.iter().all(|s| matches!(s, SplitSize::Fraction(_)));
        let mut counts: Vec<usize>;
        if !all_fractions {
            if any_fraction {
                return Err(PrepError::Config(
                    "some of the sizes (but not all) are fractions".to_string(),
                ));
            }
            counts = sizes
                .iter()
                .map(|s| match s {
                    SplitSize::Count(c) => *c,
                    SplitSize::Fraction(_) => unreachable!(),
                })
                .collect();
            if return_remained {
                let used: usize = counts.iter().sum();
                if used > n_total {
                    return Err(PrepError::Config(format!(
                        "requested {used} rows but only {n_total} are available"
                    )));
                }
                counts.push(n_total - used);
            }
        } else {
            let ratios: Vec<f64> = sizes
                .iter()
                .map(|s| match s {
                    SplitSize::Fraction(f) => *f,
                    SplitSize::Count(_) => unreachable!(),
                })
                .collect();
            let ratio_sum: f64 = ratios.iter().sum();
            if ratio_sum > 1.0 {
                return Err(PrepError::Config(
                    "sum of the fractions should not be greater than 1".to_string(),
                ));
            }
            if return_remained && (ratio_sum - 1.0).abs() < f64::EPSILON {
                return Err(PrepError::Config(
                    "sum of the fractions should be less than 1 when `return_remained` is true"
                        .to_string(),
                ));
            }
            let n_selected = (n_total as f64 * ratio_sum).floor() as usize;
            counts = ratios[..ratios.len() - 1]
                .iter()
                .map(|&r| (n_total as f64 * r).floor() as usize)
                .collect();
            let allocated: usize = counts.iter().sum();
            counts.push(n_selected - allocated);
            if ratio_sum < 1.0 {
                counts.push(n_total - n_selected);
            }
        }
        counts.into_iter().map(|c| self.split(SplitSize::Count(c))).collect()
    }
}

/// Resolve the id/time column references to positions.
fn resolve_columns(
    dataset: &TabularDataset,
    config: &TimeSeriesConfig,
) -> Result<(usize, usize)> {
    let resolve = |column: &ColumnRef| -> Result<usize> {
        match column {
            ColumnRef::Position(pos) => {
                if *pos >= dataset.x.ncols() {
                    return Err(PrepError::Config(format!(
                        "column position {pos} is out of range for {} feature columns",
                        dataset.x.ncols()
                    )));
                }
                Ok(*pos)
            }
            ColumnRef::Name(name) => {
                let names = dataset.column_names.as_ref().ok_or_else(|| {
                    PrepError::Config(
                        "name-addressed time series columns require dataset column names"
                            .to_string(),
                    )
                })?;
                names.iter().position(|n| n == name).ok_or_else(|| {
                    PrepError::Config(format!("column '{name}' not found"))
                })
            }
        }
    };
    let id_pos = resolve(&config.id_column)?;
    let time_pos = resolve(&config.time_column)?;
    if id_pos == time_pos {
        return Err(PrepError::Config(
            "id_column and time_column must refer to different columns".to_string(),
        ));
    }
    Ok((id_pos, time_pos))
}

/// Rebuild the dataset without the id/time columns.
fn drop_columns(dataset: TabularDataset, id_pos: usize, time_pos: usize) -> TabularDataset {
    let keep: Vec<usize> =
        (0..dataset.x.ncols()).filter(|&c| c != id_pos && c != time_pos).collect();
    let x = dataset.x.select(ndarray::Axis(1), &keep);
    let column_names = dataset
        .column_names
        .map(|names| keep.iter().map(|&c| names[c].clone()).collect());
    TabularDataset { x, y: dataset.y, task_type: dataset.task_type, column_names }
}
