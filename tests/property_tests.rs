#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use hintspan::connector::{FixtureCatalog, FixtureFactory};
use hintspan::search::{ExplorationMode, SearchOptions};
use hintspan::{Classifier, HintSet, PlanHash, SpanSearch};
use proptest::prelude::*;
use serde_json::Value;

#[derive(Debug, Clone)]
struct Recorded {
    mask: u16,
    outcome: Option<u8>,
}

fn knob(i: usize) -> String {
    format!("k{i}")
}

fn key_of(mask: u16, knobs: usize) -> String {
    (0..knobs)
        .filter(|i| mask & (1 << i) != 0)
        .map(knob)
        .collect::<Vec<_>>()
        .join(",")
}

fn arb_catalog() -> impl Strategy<Value = FixtureCatalog> {
    (1usize..=7).prop_flat_map(|knobs| {
        let limit = 1u16 << knobs;
        prop::collection::vec(
            (1..limit, prop::option::weighted(0.8, 0u8..4)).prop_map(|(mask, outcome)| {
                Recorded { mask, outcome }
            }),
            0..12,
        )
        .prop_map(move |recorded| {
            let mut plans = BTreeMap::new();
            let mut failed = BTreeSet::new();
            for entry in recorded {
                let key = key_of(entry.mask, knobs);
                match entry.outcome {
                    Some(plan) => {
                        plans.insert(key, Value::String(format!("p{plan}")));
                    }
                    None => {
                        failed.insert(key);
                    }
                }
            }
            FixtureCatalog {
                knobs: (0..knobs).map(knob).collect(),
                default_plan: Value::String("p0".into()),
                plans,
                failed,
            }
        })
    })
}

fn arb_mode() -> impl Strategy<Value = ExplorationMode> {
    prop_oneof![
        Just(ExplorationMode::Singleton),
        Just(ExplorationMode::Iterative),
        Just(ExplorationMode::Batch),
    ]
}

proptest! {
    #[test]
    fn prop_resolved_knobs_is_union_of_chain(
        chain in prop::collection::vec(prop::collection::btree_set("[a-e]", 1..3), 1..6)
    ) {
        let mut parent: Option<Arc<HintSet>> = None;
        let mut expected = BTreeSet::new();
        for knobs in &chain {
            expected.extend(knobs.iter().cloned());
            parent = Some(Arc::new(HintSet::new(knobs.iter().cloned(), parent)));
        }
        let leaf = parent.expect("non-empty chain");
        prop_assert_eq!(leaf.resolved_knobs(), expected);
        prop_assert_eq!(leaf.depth(), chain.len() - 1);
    }

    #[test]
    fn prop_root_resolves_to_own_knobs(knobs in prop::collection::btree_set("[a-z]{1,6}", 1..5)) {
        let hint_set = HintSet::new(knobs.iter().cloned(), None);
        prop_assert_eq!(hint_set.resolved_knobs(), knobs);
    }

    #[test]
    fn prop_classification_is_idempotent(hashes in prop::collection::vec(0u64..4, 1..20), baseline in 0u64..4, failed in 0u64..4) {
        let classifier = Classifier::with_failed(PlanHash(baseline), PlanHash(failed));
        for hash in hashes {
            let first = classifier.classify(PlanHash(hash));
            prop_assert_eq!(first, classifier.classify(PlanHash(hash)));
        }
    }

    #[test]
    fn prop_singleton_round_costs_k_plus_one(catalog in arb_catalog()) {
        let knobs = catalog.knobs.len();
        let factory = FixtureFactory::new(catalog);
        let options = SearchOptions::new(3, ExplorationMode::Singleton).expect("options");
        let span = SpanSearch::new(options).run(&factory, "select 1").expect("search");

        prop_assert_eq!(span.stats().explains, knobs + 1);
        prop_assert_eq!(factory.explain_count(), knobs + 1);
        prop_assert_eq!(span.stats().rounds, 1);
    }

    #[test]
    fn prop_span_layout(catalog in arb_catalog(), mode in arb_mode()) {
        let factory = FixtureFactory::new(catalog);
        let options = SearchOptions::new(2, mode).expect("options");
        let span = SpanSearch::new(options).run(&factory, "select 1").expect("search");

        let entries = span.entries();
        prop_assert!(entries[0].is_baseline());
        let required = entries[1..].iter().take_while(|entry| entry.required).count();
        for entry in &entries[1..=required] {
            prop_assert_eq!(entry.plan_hash(), Some(PlanHash::failed()));
        }
        for entry in &entries[required + 1..] {
            prop_assert!(!entry.required);
            prop_assert!(!entry.knobs().is_empty());
        }
    }

    #[test]
    fn prop_each_knob_consumed_once(catalog in arb_catalog(), mode in arb_mode()) {
        let factory = FixtureFactory::new(catalog);
        let options = SearchOptions::new(2, mode).expect("options");
        let span = SpanSearch::new(options).run(&factory, "select 1").expect("search");

        let mut seen = HashSet::new();
        for entry in span.entries() {
            for knob in entry.knobs() {
                prop_assert!(seen.insert(knob.clone()), "{} attached twice", knob);
            }
        }
    }

    #[test]
    fn prop_batch_union_never_shrinks(catalog in arb_catalog()) {
        let knobs = catalog.knobs.len();
        let factory = FixtureFactory::new(catalog);
        let options = SearchOptions::new(2, ExplorationMode::Batch).expect("options");
        let span = SpanSearch::new(options).run(&factory, "select 1").expect("search");

        let mut previous = BTreeSet::new();
        for union in span.alternatives().filter_map(|entry| entry.parent()) {
            let current = union.resolved_knobs();
            prop_assert!(previous.is_subset(&current));
            previous = current;
        }
        // Each round removes at least one pending knob, so rounds stay bounded.
        prop_assert!(span.stats().rounds <= knobs + 1);
    }
}
