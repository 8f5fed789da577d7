//! Persistence of discovered query spans.
//!
//! The engine itself never writes anything; [`run_query_span`](crate::driver::run_query_span)
//! hands each finished span to a [`SpanStore`].

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::search::QuerySpan;

/// SQLite-backed store.
mod sqlite;

pub use sqlite::SqliteSpanStore;

/// Tables a span is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanTable {
    /// One row per span entry.
    EffectiveOptimizers,
    /// One row per child/parent edge.
    OptimizerDependencies,
}

impl SpanTable {
    /// SQL table name.
    pub fn as_str(self) -> &'static str {
        match self {
            SpanTable::EffectiveOptimizers => "query_effective_optimizers",
            SpanTable::OptimizerDependencies => "query_effective_optimizers_dependencies",
        }
    }
}

/// Hint-set row read back from a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredHintSet {
    /// Canonical hint-set key.
    pub key: String,
    /// Required flag at discovery time.
    pub required: bool,
}

/// Dependency edge read back from a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDependency {
    /// Key of the dependent hint-set.
    pub child: String,
    /// Key of the hint-set it was chained under.
    pub parent: String,
}

/// Destination for query spans.
pub trait SpanStore {
    /// Records a query before its span is searched.
    fn register_query(&mut self, query_id: &str) -> Result<()>;

    /// Loads the SQL text of a query.
    fn read_sql(&self, query_path: &Path) -> Result<String> {
        Ok(fs::read_to_string(query_path)?)
    }

    /// Persists one span entry.
    fn register_optimizer(
        &mut self,
        query_id: &str,
        key: &str,
        required: bool,
        table: SpanTable,
    ) -> Result<()>;

    /// Persists one dependency edge.
    fn register_optimizer_dependency(
        &mut self,
        query_id: &str,
        child_key: &str,
        parent_key: &str,
        table: SpanTable,
    ) -> Result<()>;

    /// Persists every entry of `span` and its dependency edge.
    ///
    /// Implementations backed by a transactional store write the span as a
    /// unit. The default writes row by row through the `register_*` methods.
    fn write_span(&mut self, query_id: &str, span: &QuerySpan) -> Result<()> {
        for entry in span.entries() {
            let key = entry.key();
            info!(hint_set = %key, required = entry.required, "found new hint-set");
            self.register_optimizer(query_id, &key, entry.required, SpanTable::EffectiveOptimizers)?;
            if let Some(parent) = entry.parent() {
                self.register_optimizer_dependency(
                    query_id,
                    &key,
                    &parent.key(),
                    SpanTable::OptimizerDependencies,
                )?;
            }
        }
        Ok(())
    }

    /// Span entries stored for a query, in insertion order.
    fn hint_sets(&self, query_id: &str) -> Result<Vec<StoredHintSet>>;

    /// Dependency edges stored for a query, in insertion order.
    fn dependencies(&self, query_id: &str) -> Result<Vec<StoredDependency>>;
}
