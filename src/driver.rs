use std::path::Path;

use tracing::info;

use crate::connector::ConnectorFactory;
use crate::error::Result;
use crate::search::{QuerySpan, SpanSearch};
use crate::storage::SpanStore;

/// Searches the span of the query stored at `query_path` and persists it.
///
/// The query is registered and its SQL loaded before the search starts.
/// Nothing from the span is written unless the search completes, and the
/// store decides whether the span lands as a unit.
pub fn run_query_span<F, S>(
    factory: &F,
    store: &mut S,
    query_path: &Path,
    search: &SpanSearch,
) -> Result<QuerySpan>
where
    F: ConnectorFactory,
    S: SpanStore + ?Sized,
{
    let query_id = query_path.to_string_lossy();
    info!(query = %query_id, "approximate query span");
    store.register_query(&query_id)?;
    let sql = store.read_sql(query_path)?;

    let span = search.run(factory, &sql)?;
    store.write_span(&query_id, &span)?;
    Ok(span)
}
