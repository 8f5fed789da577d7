use std::num::NonZeroUsize;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::connector::ConnectorFactory;
use crate::error::Result;
use crate::fetch::fetch_plan;
use crate::hintset::HintSet;

/// Bounded set of explain workers owned by a single span search.
///
/// Each round fans its hint-sets out over the workers and returns only once
/// every fetch has completed, so rounds never overlap. Dropping the pool
/// tells the idle workers to exit without waiting for them; no fetch is in
/// flight by then.
pub struct FetchPool<'a, F: ConnectorFactory> {
    pool: ThreadPool,
    factory: &'a F,
    sql: &'a str,
    rounds: usize,
    explains: usize,
}

impl<'a, F: ConnectorFactory> FetchPool<'a, F> {
    /// Starts `workers` threads explaining `sql` through `factory`.
    pub fn new(factory: &'a F, sql: &'a str, workers: NonZeroUsize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.get())
            .thread_name(|index| format!("hintspan-explain-{index}"))
            .build()?;
        debug!(workers = workers.get(), "explain pool started");
        Ok(Self {
            pool,
            factory,
            sql,
            rounds: 0,
            explains: 0,
        })
    }

    /// Fetches one hint-set on the calling thread.
    pub fn fetch_one(&mut self, hint_set: HintSet) -> Result<HintSet> {
        self.explains += 1;
        fetch_plan(self.factory, self.sql, hint_set)
    }

    /// Fetches every hint-set in parallel and waits for all of them.
    ///
    /// Results keep the input order. The first connector fault aborts the
    /// round and is returned.
    pub fn fetch_round(&mut self, hint_sets: Vec<HintSet>) -> Result<Vec<HintSet>> {
        self.rounds += 1;
        self.explains += hint_sets.len();
        let factory = self.factory;
        let sql = self.sql;
        self.pool.install(|| {
            hint_sets
                .into_par_iter()
                .map(|hint_set| fetch_plan(factory, sql, hint_set))
                .collect()
        })
    }

    /// Rounds run so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Explain calls issued so far.
    pub fn explains(&self) -> usize {
        self.explains
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{FixtureCatalog, FixtureFactory};
    use serde_json::json;

    fn factory() -> FixtureFactory {
        let catalog: FixtureCatalog = serde_json::from_value(json!({
            "knobs": ["a", "b", "c", "d"],
            "default_plan": "p0",
            "failed": ["c"]
        }))
        .expect("fixture json");
        FixtureFactory::new(catalog)
    }

    #[test]
    fn round_preserves_order_and_counts() -> Result<()> {
        let factory = factory();
        let workers = NonZeroUsize::new(3).expect("non-zero");
        let mut pool = FetchPool::new(&factory, "select 1", workers)?;
        let fetched = pool.fetch_round(
            ["a", "b", "c", "d"]
                .into_iter()
                .map(HintSet::singleton)
                .collect(),
        )?;
        let keys: Vec<_> = fetched.iter().map(HintSet::key).collect();
        assert_eq!(keys, ["a", "b", "c", "d"]);
        assert!(fetched[2].plan().expect("fetched").is_failed());
        assert_eq!(pool.rounds(), 1);
        assert_eq!(pool.explains(), 4);
        assert_eq!(factory.explain_count(), 4);
        Ok(())
    }
}
