use serde::Serialize;

use crate::error::{Result, SpanError};
use crate::hintset::HintSet;
use crate::plan::PlanHash;

/// Bucket a fetched plan falls into relative to a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanClass {
    /// Same hash as the baseline: the knobs had no observable effect.
    Same,
    /// A different plan.
    Alternative,
    /// The optimizer failed to plan the query.
    Failed,
}

/// Compares plan hashes against a baseline and the failure sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    baseline: PlanHash,
    failed: PlanHash,
}

/// Fetched hint-sets grouped by [`PlanClass`], each group in input order.
#[derive(Debug, Default)]
pub struct Buckets {
    /// No effect relative to the baseline.
    pub same: Vec<HintSet>,
    /// Different plan.
    pub alternative: Vec<HintSet>,
    /// Planning failed.
    pub failed: Vec<HintSet>,
}

impl Classifier {
    /// Classifier for `baseline`, using the standard failure hash.
    pub fn new(baseline: PlanHash) -> Self {
        Self::with_failed(baseline, PlanHash::failed())
    }

    /// Classifier with an explicit failure hash.
    pub fn with_failed(baseline: PlanHash, failed: PlanHash) -> Self {
        Self { baseline, failed }
    }

    /// Baseline hash.
    pub fn baseline(&self) -> PlanHash {
        self.baseline
    }

    /// Classifies a single hash. The failure sentinel wins over the baseline,
    /// so a failing candidate is reported as failed even when the baseline
    /// itself failed.
    pub fn classify(&self, hash: PlanHash) -> PlanClass {
        if hash == self.failed {
            PlanClass::Failed
        } else if hash == self.baseline {
            PlanClass::Same
        } else {
            PlanClass::Alternative
        }
    }

    /// Splits fetched hint-sets into buckets.
    ///
    /// Every hint-set must carry a plan; an unfetched one is reported as a
    /// connector fault.
    pub fn partition(&self, fetched: Vec<HintSet>) -> Result<Buckets> {
        let mut buckets = Buckets::default();
        for hint_set in fetched {
            match self.classify(fetched_hash(&hint_set)?) {
                PlanClass::Same => buckets.same.push(hint_set),
                PlanClass::Alternative => buckets.alternative.push(hint_set),
                PlanClass::Failed => buckets.failed.push(hint_set),
            }
        }
        Ok(buckets)
    }
}

/// Hash of a hint-set that has just been fetched.
pub(crate) fn fetched_hash(hint_set: &HintSet) -> Result<PlanHash> {
    hint_set
        .plan_hash()
        .ok_or_else(|| SpanError::connector(format!("no plan recorded for [{hint_set}]")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Plan;

    fn fetched(knob: &str, plan: Plan) -> HintSet {
        let mut hint_set = HintSet::singleton(knob);
        hint_set.set_plan(plan);
        hint_set
    }

    fn keys(hint_sets: &[HintSet]) -> Vec<String> {
        hint_sets.iter().map(HintSet::key).collect()
    }

    #[test]
    fn buckets_by_hash_only() -> Result<()> {
        let baseline = Plan::Explained("p0".into()).hash();
        let classifier = Classifier::new(baseline);
        let buckets = classifier.partition(vec![
            fetched("k1", Plan::Explained("p0".into())),
            fetched("k2", Plan::Explained("p1".into())),
            fetched("k3", Plan::Failed),
            fetched("k4", Plan::Explained("p2".into())),
        ])?;
        assert_eq!(keys(&buckets.same), ["k1"]);
        assert_eq!(keys(&buckets.alternative), ["k2", "k4"]);
        assert_eq!(keys(&buckets.failed), ["k3"]);
        Ok(())
    }

    #[test]
    fn failure_takes_precedence_over_failed_baseline() {
        let classifier = Classifier::new(PlanHash::failed());
        assert_eq!(classifier.classify(PlanHash::failed()), PlanClass::Failed);
        assert_eq!(
            classifier.classify(Plan::Explained("p".into()).hash()),
            PlanClass::Alternative
        );
    }

    #[test]
    fn unfetched_hint_set_is_rejected() {
        let classifier = Classifier::new(PlanHash(1));
        let err = classifier
            .partition(vec![
                fetched("k1", Plan::Explained("p0".into())),
                HintSet::singleton("k2"),
            ])
            .unwrap_err();
        assert!(matches!(err, SpanError::Connector(msg) if msg.contains("[k2]")));
    }
}
