use tracing::trace;

use crate::connector::{Connector, ConnectorFactory};
use crate::error::Result;
use crate::hintset::HintSet;

/// Fetches the plan of one hint-set on a fresh connector session.
///
/// The session disables the hint-set's resolved knobs (its own plus every
/// ancestor's) before explaining. The populated hint-set is handed back so the
/// caller can correlate the plan with its origin.
pub fn fetch_plan<F>(factory: &F, sql: &str, mut hint_set: HintSet) -> Result<HintSet>
where
    F: ConnectorFactory + ?Sized,
{
    let mut connector = factory.connect()?;
    connector.set_disabled_knobs(&hint_set.resolved_knobs())?;
    let plan = connector.explain(sql)?;
    trace!(hint_set = %hint_set, failed = plan.is_failed(), "fetched plan");
    hint_set.set_plan(plan);
    Ok(hint_set)
}
