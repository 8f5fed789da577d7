use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::plan::{Plan, PlanHash};

/// Separator between knob identifiers in a hint-set key.
pub const KNOB_SEPARATOR: &str = ",";

/// Runtime placeholder until a hint-set has been benchmarked.
pub const UNPREDICTED_RUNTIME: f64 = -1.0;

/// A set of optimizer knobs disabled together, optionally layered on top of a
/// parent hint-set.
///
/// The parent is fixed at construction, so dependency chains are acyclic and
/// can be walked without cycle detection. A hint-set becomes shareable (and is
/// wrapped in an [`Arc`]) only after its plan has been fetched and classified.
#[derive(Debug, Clone)]
pub struct HintSet {
    knobs: BTreeSet<String>,
    parent: Option<Arc<HintSet>>,
    plan: Option<Plan>,
    /// Set when omitting these knobs makes plan generation fail.
    pub required: bool,
    /// Reserved for benchmarking; [`UNPREDICTED_RUNTIME`] until then.
    pub predicted_runtime: f64,
}

impl HintSet {
    /// Creates a hint-set disabling `knobs` on top of `parent`.
    pub fn new<I, S>(knobs: I, parent: Option<Arc<HintSet>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            knobs: knobs.into_iter().map(Into::into).collect(),
            parent,
            plan: None,
            required: false,
            predicted_runtime: UNPREDICTED_RUNTIME,
        }
    }

    /// The hint-set with no knobs, used to fetch the unmodified plan.
    pub fn baseline() -> Self {
        Self::new(std::iter::empty::<String>(), None)
    }

    /// Single knob with no parent.
    pub fn singleton(knob: impl Into<String>) -> Self {
        Self::new([knob.into()], None)
    }

    /// Knobs owned by this hint-set, excluding the parent chain.
    pub fn knobs(&self) -> &BTreeSet<String> {
        &self.knobs
    }

    /// Parent hint-set, if any.
    pub fn parent(&self) -> Option<&Arc<HintSet>> {
        self.parent.as_ref()
    }

    /// Returns `true` for the empty-knob baseline.
    pub fn is_baseline(&self) -> bool {
        self.knobs.is_empty() && self.parent.is_none()
    }

    /// Every knob that must be disabled: own knobs plus all ancestors' knobs.
    pub fn resolved_knobs(&self) -> BTreeSet<String> {
        let mut resolved = self.knobs.clone();
        let mut cursor = self.parent.as_deref();
        while let Some(ancestor) = cursor {
            resolved.extend(ancestor.knobs.iter().cloned());
            cursor = ancestor.parent.as_deref();
        }
        resolved
    }

    /// Number of ancestors above this hint-set.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent.as_deref();
        while let Some(ancestor) = cursor {
            depth += 1;
            cursor = ancestor.parent.as_deref();
        }
        depth
    }

    /// Own knobs joined by [`KNOB_SEPARATOR`], used to match pending
    /// candidates by value.
    pub fn own_key(&self) -> String {
        join_knobs(&self.knobs)
    }

    /// Canonical key: own knobs followed by the parent's key. Used in logs and
    /// as the storage key.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Fetched plan, `None` until a fetch completes.
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Hash of the fetched plan.
    pub fn plan_hash(&self) -> Option<PlanHash> {
        self.plan.as_ref().map(Plan::hash)
    }

    pub(crate) fn set_plan(&mut self, plan: Plan) {
        debug_assert!(self.plan.is_none(), "plan of {self} fetched twice");
        self.plan = Some(plan);
    }
}

impl fmt::Display for HintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let own = join_knobs(&self.knobs);
        match &self.parent {
            Some(parent) if own.is_empty() => write!(f, "{parent}"),
            Some(parent) => write!(f, "{own}{KNOB_SEPARATOR}{parent}"),
            None => f.write_str(&own),
        }
    }
}

/// Joins knobs in their sorted order.
pub fn join_knobs<'a, I>(knobs: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    knobs
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(KNOB_SEPARATOR)
}
