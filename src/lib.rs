//! Query span approximation for cost-based optimizers.
//!
//! Given a query and an optimizer whose rules ("knobs") can be disabled, the
//! crate finds the small set of knob combinations ("hint-sets") that either
//! change the chosen plan or are needed for the optimizer to produce a plan
//! at all. That set is the query's span, the candidates worth benchmarking.

#![warn(missing_docs)]

/// Classification of fetched plans against a baseline.
pub mod classify;
/// TOML configuration.
pub mod config;
/// Optimizer connector interface.
pub mod connector;
/// Search, register and persist one query.
pub mod driver;
/// Crate error type.
pub mod error;
/// Plan fetching unit of work.
pub mod fetch;
/// Hint-set entity.
pub mod hintset;
/// Explain results and hashes.
pub mod plan;
/// Bounded explain worker pool.
pub mod pool;
/// Span search engine and exploration strategies.
pub mod search;
/// Span persistence.
pub mod storage;
/// Log output setup.
pub mod telemetry;

pub use classify::{Classifier, PlanClass};
pub use connector::{Connector, ConnectorFactory};
pub use driver::run_query_span;
pub use error::{Result, SpanError};
pub use hintset::HintSet;
pub use plan::{Plan, PlanHash};
pub use search::{ExplorationMode, QuerySpan, SearchOptions, SpanSearch};
pub use storage::{SpanStore, SqliteSpanStore};
