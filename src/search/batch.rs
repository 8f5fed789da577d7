use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info};

use super::{Explore, PendingPool};
use crate::classify::{fetched_hash, Classifier};
use crate::connector::ConnectorFactory;
use crate::error::Result;
use crate::hintset::HintSet;
use crate::pool::FetchPool;

/// Round-wise expansion over the union of all effective knobs.
///
/// Every round explains the cumulative union on its own to get the round's
/// baseline, then every pending knob chained under the union. Alternatives are
/// recorded in the span with the union as parent, and their own knobs are
/// folded into the next union. The union is flat: which earlier knob enabled
/// which later one is not kept. The union only grows, and the search stops
/// after the first round that adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchExplorer;

impl Explore for BatchExplorer {
    fn explore<F: ConnectorFactory>(
        &self,
        pool: &mut FetchPool<'_, F>,
        frontier: VecDeque<Arc<HintSet>>,
        pending: &mut PendingPool,
    ) -> Result<Vec<Arc<HintSet>>> {
        let mut discovered: Vec<Arc<HintSet>> = frontier.into();
        let mut cumulative: BTreeSet<String> = discovered
            .iter()
            .flat_map(|hint_set| hint_set.knobs().iter().cloned())
            .collect();

        while !cumulative.is_empty() && !pending.is_empty() {
            let union = Arc::new(pool.fetch_one(HintSet::new(cumulative.iter().cloned(), None))?);
            let classifier = Classifier::new(fetched_hash(&union)?);
            debug!(union = %union, hash = %classifier.baseline(), "batch round baseline");

            let fetched = pool.fetch_round(pending.candidates(Some(&union)))?;
            let buckets = classifier.partition(fetched)?;
            info!(
                cumulative = cumulative.len(),
                alternatives = buckets.alternative.len(),
                "batch round classified"
            );
            if buckets.alternative.is_empty() {
                break;
            }

            for alternative in buckets.alternative {
                pending.remove(&alternative);
                cumulative.extend(alternative.knobs().iter().cloned());
                debug!(hint_set = %alternative, "new alternative hint-set");
                discovered.push(Arc::new(alternative));
            }
        }
        Ok(discovered)
    }
}
