use std::sync::Arc;

use serde::Serialize;

use crate::hintset::HintSet;
use crate::plan::PlanHash;

/// Work performed by one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Parallel fetch rounds, the singleton round included.
    pub rounds: usize,
    /// Explain calls, the baseline included.
    pub explains: usize,
}

/// The hint-sets worth benchmarking for one query, in discovery order.
#[derive(Debug, Clone)]
pub struct QuerySpan {
    entries: Vec<Arc<HintSet>>,
    stats: SearchStats,
}

/// Serializable view of one span entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanEntryReport {
    /// Canonical key, parent chain included.
    pub key: String,
    /// Own knobs.
    pub knobs: Vec<String>,
    /// Canonical key of the parent.
    pub parent: Option<String>,
    /// Whether the knobs must be disabled for planning to succeed.
    pub required: bool,
    /// Hash of the fetched plan.
    pub plan_hash: Option<PlanHash>,
}

impl QuerySpan {
    pub(crate) fn new(entries: Vec<Arc<HintSet>>, stats: SearchStats) -> Self {
        Self { entries, stats }
    }

    /// Baseline followed by required and alternative hint-sets.
    pub fn entries(&self) -> &[Arc<HintSet>] {
        &self.entries
    }

    /// The unmodified-plan entry.
    pub fn baseline(&self) -> Option<&Arc<HintSet>> {
        self.entries.first()
    }

    /// Entries flagged as required.
    pub fn required(&self) -> impl Iterator<Item = &Arc<HintSet>> {
        self.entries.iter().filter(|entry| entry.required)
    }

    /// Entries producing an alternative plan.
    pub fn alternatives(&self) -> impl Iterator<Item = &Arc<HintSet>> {
        self.entries
            .iter()
            .filter(|entry| !entry.required && !entry.is_baseline())
    }

    /// Looks an entry up by its canonical key.
    pub fn find(&self, key: &str) -> Option<&Arc<HintSet>> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    /// Number of entries, baseline included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the span holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Search statistics.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Serializable view of every entry.
    pub fn report(&self) -> Vec<SpanEntryReport> {
        self.entries
            .iter()
            .map(|entry| SpanEntryReport {
                key: entry.key(),
                knobs: entry.knobs().iter().cloned().collect(),
                parent: entry.parent().map(|parent| parent.key()),
                required: entry.required,
                plan_hash: entry.plan_hash(),
            })
            .collect()
    }
}
