use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use super::{Explore, PendingPool};
use crate::classify::{fetched_hash, Classifier};
use crate::connector::ConnectorFactory;
use crate::error::Result;
use crate::hintset::HintSet;
use crate::pool::FetchPool;

/// Breadth-first expansion of effective hint-sets.
///
/// Each effective hint-set `E` is taken from the front of the frontier and
/// becomes the local baseline: every pending knob is explained again chained
/// under `E`. Candidates whose plan differs from `E`'s join the back of the
/// frontier and leave the pending pool, so a knob is attached to at most one
/// ancestor across the whole search. Candidates that fail under `E` are
/// dropped and stay pending.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterativeExplorer;

impl Explore for IterativeExplorer {
    fn explore<F: ConnectorFactory>(
        &self,
        pool: &mut FetchPool<'_, F>,
        mut frontier: VecDeque<Arc<HintSet>>,
        pending: &mut PendingPool,
    ) -> Result<Vec<Arc<HintSet>>> {
        let mut discovered = Vec::with_capacity(frontier.len());
        while let Some(effective) = frontier.pop_front() {
            discovered.push(Arc::clone(&effective));
            if pending.is_empty() {
                continue;
            }

            let classifier = Classifier::new(fetched_hash(&effective)?);
            let fetched = pool.fetch_round(pending.candidates(Some(&effective)))?;
            let buckets = classifier.partition(fetched)?;
            debug!(
                parent = %effective,
                alternatives = buckets.alternative.len(),
                failed = buckets.failed.len(),
                "expanded hint-set"
            );
            for failed in &buckets.failed {
                debug!(hint_set = %failed, "candidate fails under parent, dropped");
            }

            for alternative in buckets.alternative {
                pending.remove(&alternative);
                debug!(hint_set = %alternative, "new alternative hint-set");
                frontier.push_back(Arc::new(alternative));
            }
        }
        Ok(discovered)
    }
}
