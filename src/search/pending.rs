use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::hintset::{join_knobs, HintSet};

/// Knob sets still worth testing, keyed by their joined knob string.
///
/// Removal is by value: any hint-set owning the same knobs removes the entry,
/// regardless of its parent. Iteration follows key order so candidate rounds
/// are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPool {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl PendingPool {
    /// One singleton entry per knob; duplicates collapse.
    pub fn from_knobs<I, S>(knobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = knobs
            .into_iter()
            .map(|knob| {
                let knob = knob.into();
                (knob.clone(), BTreeSet::from([knob]))
            })
            .collect();
        Self { entries }
    }

    /// Number of pending knob sets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is left to test.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry with this joined knob string is pending.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drops the entry owning the same knobs as `hint_set`.
    pub fn remove(&mut self, hint_set: &HintSet) -> bool {
        self.entries.remove(&join_knobs(hint_set.knobs())).is_some()
    }

    /// Fresh candidates for every pending entry, chained under `parent`.
    pub fn candidates(&self, parent: Option<&Arc<HintSet>>) -> Vec<HintSet> {
        self.entries
            .values()
            .map(|knobs| HintSet::new(knobs.iter().cloned(), parent.cloned()))
            .collect()
    }

    /// Pending keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
