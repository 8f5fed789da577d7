use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::{Connector, ConnectorFactory};
use crate::error::{Result, SpanError};
use crate::hintset::{join_knobs, KNOB_SEPARATOR};
use crate::plan::Plan;

/// Recorded explain results keyed by disabled-knob combination.
///
/// Keys are the sorted knob identifiers joined by `,`. A recorded combination
/// also applies to every superset of it, unless a larger recorded combination
/// inside that superset overrides it; among equally large matches the first in
/// key order wins and a failure wins over a plan. Combinations with no recorded
/// subset explain to `default_plan`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureCatalog {
    /// Knob catalogue reported to the engine.
    pub knobs: Vec<String>,
    /// Plan returned when nothing relevant is disabled.
    pub default_plan: Value,
    /// Plans for specific combinations.
    #[serde(default)]
    pub plans: BTreeMap<String, Value>,
    /// Combinations the optimizer cannot plan.
    #[serde(default)]
    pub failed: BTreeSet<String>,
}

impl FixtureCatalog {
    /// Reads a catalogue from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Looks up the plan recorded for `disabled`.
    pub fn plan_for(&self, disabled: &BTreeSet<String>) -> Plan {
        let best = self
            .failed
            .iter()
            .map(|key| (key, None))
            .chain(self.plans.iter().map(|(key, value)| (key, Some(value))))
            .filter(|(key, _)| covers(disabled, key))
            .max_by_key(|(key, value)| (knob_count(key), value.is_none(), Reverse(*key)));
        match best {
            Some((_, None)) => Plan::Failed,
            Some((_, Some(value))) => Plan::Explained(value.to_string()),
            None => Plan::Explained(self.default_plan.to_string()),
        }
    }
}

fn knob_count(key: &str) -> usize {
    key.split(KNOB_SEPARATOR).filter(|knob| !knob.is_empty()).count()
}

/// Whether every knob of `key` is disabled.
fn covers(disabled: &BTreeSet<String>, key: &str) -> bool {
    key.split(KNOB_SEPARATOR)
        .filter(|knob| !knob.is_empty())
        .all(|knob| disabled.contains(knob))
}

/// Factory handing out [`FixtureConnector`] sessions over one catalogue.
#[derive(Debug, Clone)]
pub struct FixtureFactory {
    catalog: Arc<FixtureCatalog>,
    explains: Arc<AtomicUsize>,
    explained: Arc<Mutex<Vec<String>>>,
}

impl FixtureFactory {
    /// Wraps a catalogue.
    pub fn new(catalog: FixtureCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            explains: Arc::new(AtomicUsize::new(0)),
            explained: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Loads the catalogue from `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        FixtureCatalog::load(path).map(Self::new)
    }

    /// Total explains served by sessions of this factory.
    pub fn explain_count(&self) -> usize {
        self.explains.load(Ordering::Relaxed)
    }

    /// Keys explained so far, in completion order.
    pub fn explained_keys(&self) -> Vec<String> {
        self.explained.lock().clone()
    }
}

impl ConnectorFactory for FixtureFactory {
    type Connector = FixtureConnector;

    fn knobs(&self) -> Result<Vec<String>> {
        Ok(self.catalog.knobs.clone())
    }

    fn connect(&self) -> Result<FixtureConnector> {
        Ok(FixtureConnector {
            catalog: Arc::clone(&self.catalog),
            explains: Arc::clone(&self.explains),
            explained: Arc::clone(&self.explained),
            disabled: BTreeSet::new(),
        })
    }
}

/// Session over a [`FixtureCatalog`].
#[derive(Debug)]
pub struct FixtureConnector {
    catalog: Arc<FixtureCatalog>,
    explains: Arc<AtomicUsize>,
    explained: Arc<Mutex<Vec<String>>>,
    disabled: BTreeSet<String>,
}

impl Connector for FixtureConnector {
    fn set_disabled_knobs(&mut self, knobs: &BTreeSet<String>) -> Result<()> {
        if let Some(unknown) = knobs.iter().find(|k| !self.catalog.knobs.contains(k)) {
            return Err(SpanError::InvalidArgument(format!(
                "knob '{unknown}' is not in the fixture catalogue"
            )));
        }
        self.disabled = knobs.clone();
        Ok(())
    }

    fn explain(&mut self, _sql: &str) -> Result<Plan> {
        let key = join_knobs(&self.disabled);
        trace!(disabled = %key, "fixture explain");
        self.explains.fetch_add(1, Ordering::Relaxed);
        self.explained.lock().push(key);
        Ok(self.catalog.plan_for(&self.disabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> FixtureCatalog {
        serde_json::from_value(json!({
            "knobs": ["k1", "k2", "k3"],
            "default_plan": {"node": "SeqScan"},
            "plans": {"k2": {"node": "IndexScan"}},
            "failed": ["k3"]
        }))
        .expect("fixture json")
    }

    fn disabled(knobs: &[&str]) -> BTreeSet<String> {
        knobs.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn lookup_falls_back_to_default_plan() {
        let catalog = catalog();
        let default = catalog.plan_for(&BTreeSet::new());
        assert_eq!(catalog.plan_for(&disabled(&["k1"])), default);
        assert_ne!(catalog.plan_for(&disabled(&["k2"])), default);
        assert_eq!(catalog.plan_for(&disabled(&["k3"])), Plan::Failed);
        // k2 is the largest recorded subset of {k1, k2}.
        assert_eq!(
            catalog.plan_for(&disabled(&["k1", "k2"])),
            catalog.plan_for(&disabled(&["k2"]))
        );
    }

    #[test]
    fn recorded_combination_applies_to_supersets() {
        let mut catalog = catalog();
        catalog
            .plans
            .insert("k1,k2".into(), json!({"node": "HashJoin"}));
        let k2 = catalog.plan_for(&disabled(&["k2"]));
        let k1k2 = catalog.plan_for(&disabled(&["k1", "k2"]));
        assert_ne!(k1k2, k2);
        assert_eq!(catalog.plan_for(&disabled(&["k1", "k2"])), k1k2);
        assert_eq!(catalog.plan_for(&disabled(&["k1", "k3"])), Plan::Failed);
        // Equal size: the failure wins.
        assert_eq!(catalog.plan_for(&disabled(&["k2", "k3"])), Plan::Failed);
        // A larger recorded plan overrides a smaller failure.
        catalog
            .plans
            .insert("k2,k3".into(), json!({"node": "Sort"}));
        assert!(!catalog.plan_for(&disabled(&["k2", "k3"])).is_failed());
    }

    #[test]
    fn sessions_share_counters() -> Result<()> {
        let factory = FixtureFactory::new(catalog());
        let mut first = factory.connect()?;
        let mut second = factory.connect()?;
        first.set_disabled_knobs(&disabled(&["k2"]))?;
        first.explain("select 1")?;
        second.explain("select 1")?;
        assert_eq!(factory.explain_count(), 2);
        assert_eq!(factory.explained_keys(), vec!["k2".to_string(), String::new()]);
        Ok(())
    }

    #[test]
    fn unknown_knob_is_rejected() {
        let factory = FixtureFactory::new(catalog());
        let mut session = factory.connect().expect("connect");
        let err = session.set_disabled_knobs(&disabled(&["k9"])).unwrap_err();
        assert!(matches!(err, SpanError::InvalidArgument(_)));
    }
}
