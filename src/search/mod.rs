#![forbid(unsafe_code)]

//! Query span search.
//!
//! A search starts by explaining the query unmodified and then with every knob
//! disabled on its own. Knobs whose absence breaks planning become *required*
//! hint-sets; knobs that change the plan seed the exploration frontier. The
//! frontier is then expanded by one of the [`Explore`] strategies selected
//! through [`ExplorationMode`]:
//!
//! * [`IterativeExplorer`] re-tests the remaining knobs under each effective
//!   hint-set in turn and records which combination produced each new plan.
//! * [`BatchExplorer`] folds every effective knob into one cumulative hint-set
//!   and needs one round per depth of interaction, at the cost of flattening
//!   the dependency chain (the cumulative hint-set is recorded as the parent
//!   but is not itself part of the span).
//!
//! Rounds run strictly one after another; only the explains inside a round
//! are parallel.

mod batch;
mod iterative;
mod pending;
mod span;

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::{fetched_hash, Classifier};
use crate::connector::ConnectorFactory;
use crate::error::{Result, SpanError};
use crate::hintset::HintSet;
use crate::plan::PlanHash;
use crate::pool::FetchPool;

pub use batch::BatchExplorer;
pub use iterative::IterativeExplorer;
pub use pending::PendingPool;
pub use span::{QuerySpan, SearchStats, SpanEntryReport};

/// Worker count used when nothing else is configured.
pub const DEFAULT_WORKERS: usize = 4;

/// How far the search explores beyond single knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationMode {
    /// Stop after the singleton round.
    Singleton,
    /// Expand effective hint-sets one at a time, keeping dependency chains.
    #[default]
    Iterative,
    /// Expand all effective knobs together, one round per interaction depth.
    Batch,
}

impl fmt::Display for ExplorationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExplorationMode::Singleton => "singleton",
            ExplorationMode::Iterative => "iterative",
            ExplorationMode::Batch => "batch",
        })
    }
}

/// Stage of a running search, reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Knob catalogue read, baseline being fetched.
    Init,
    /// Every knob explained on its own.
    SingletonRound,
    /// Frontier expanded by [`IterativeExplorer`].
    ExpandIterative,
    /// Frontier expanded by [`BatchExplorer`].
    ExpandBatch,
    /// Span final.
    Done,
}

/// Parameters of a [`SpanSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Number of concurrent explains.
    pub workers: NonZeroUsize,
    /// Exploration strategy after the singleton round.
    pub mode: ExplorationMode,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN),
            mode: ExplorationMode::default(),
        }
    }
}

impl SearchOptions {
    /// Options with `workers` explain threads, rejecting zero.
    pub fn new(workers: usize, mode: ExplorationMode) -> Result<Self> {
        let workers = NonZeroUsize::new(workers).ok_or_else(|| {
            SpanError::InvalidArgument("explain worker count must be at least 1".into())
        })?;
        Ok(Self { workers, mode })
    }
}

/// Strategy expanding the frontier of effective hint-sets.
pub trait Explore {
    /// Consumes `frontier`, fetching candidates built from `pending`, and
    /// returns the span entries it contributes in discovery order. The
    /// frontier entries themselves are part of the returned entries.
    fn explore<F: ConnectorFactory>(
        &self,
        pool: &mut FetchPool<'_, F>,
        frontier: VecDeque<Arc<HintSet>>,
        pending: &mut PendingPool,
    ) -> Result<Vec<Arc<HintSet>>>;
}

/// Frontier taken as-is, without further rounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExploration;

impl Explore for NoExploration {
    fn explore<F: ConnectorFactory>(
        &self,
        _pool: &mut FetchPool<'_, F>,
        frontier: VecDeque<Arc<HintSet>>,
        _pending: &mut PendingPool,
    ) -> Result<Vec<Arc<HintSet>>> {
        Ok(frontier.into())
    }
}

/// Computes query spans.
#[derive(Debug, Clone, Default)]
pub struct SpanSearch {
    options: SearchOptions,
}

impl SpanSearch {
    /// Engine running with `options`.
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Approximates the span of `sql`.
    ///
    /// The returned span starts with the baseline, followed by the required
    /// hint-sets and then every hint-set that produced an alternative plan.
    /// A connector fault aborts the search and discards all round state.
    pub fn run<F: ConnectorFactory>(&self, factory: &F, sql: &str) -> Result<QuerySpan> {
        let mut pending = PendingPool::from_knobs(factory.knobs()?);
        info!(
            knobs = pending.len(),
            mode = %self.options.mode,
            workers = self.options.workers.get(),
            phase = ?SearchPhase::Init,
            "approximating query span"
        );
        let mut pool = FetchPool::new(factory, sql, self.options.workers)?;

        let baseline = pool.fetch_one(HintSet::baseline())?;
        let baseline_hash = fetched_hash(&baseline)?;
        info!(hash = %baseline_hash, "default plan hash");
        info!(hash = %PlanHash::failed(), "failed plan hash");
        if baseline_hash == PlanHash::failed() {
            warn!("optimizer cannot plan the query with every knob enabled");
        }
        let mut entries = vec![Arc::new(baseline)];

        debug!(phase = ?SearchPhase::SingletonRound, candidates = pending.len(), "starting round");
        let fetched = pool.fetch_round(pending.candidates(None))?;
        let buckets = Classifier::new(baseline_hash).partition(fetched)?;
        info!(
            alternatives = buckets.alternative.len(),
            required = buckets.failed.len(),
            "singleton round classified"
        );

        for mut required in buckets.failed {
            pending.remove(&required);
            required.required = true;
            debug!(hint_set = %required, "required hint-set");
            entries.push(Arc::new(required));
        }
        let mut frontier = VecDeque::with_capacity(buckets.alternative.len());
        for alternative in buckets.alternative {
            pending.remove(&alternative);
            frontier.push_back(Arc::new(alternative));
        }

        let explored = match self.options.mode {
            ExplorationMode::Singleton => NoExploration.explore(&mut pool, frontier, &mut pending),
            ExplorationMode::Iterative => {
                debug!(phase = ?SearchPhase::ExpandIterative, frontier = frontier.len(), "exploring");
                IterativeExplorer.explore(&mut pool, frontier, &mut pending)
            }
            ExplorationMode::Batch => {
                debug!(phase = ?SearchPhase::ExpandBatch, frontier = frontier.len(), "exploring");
                BatchExplorer.explore(&mut pool, frontier, &mut pending)
            }
        }?;
        entries.extend(explored);

        let stats = SearchStats {
            rounds: pool.rounds(),
            explains: pool.explains(),
        };
        info!(
            phase = ?SearchPhase::Done,
            entries = entries.len(),
            rounds = stats.rounds,
            explains = stats.explains,
            "query span complete"
        );
        Ok(QuerySpan::new(entries, stats))
    }
}
