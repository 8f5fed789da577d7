//! Explain results and their hashes.
//!
//! Plans are compared only by hash. Two different plans whose texts hash to
//! the same value are treated as the same plan; this loss is accepted and not
//! detected.

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

const FAILED_MARKER: &[u8] = b"FAILED";

/// Outcome of asking an optimizer to explain a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// Plan text as returned by the optimizer (for example JSON explain output).
    Explained(String),
    /// The optimizer could not produce a plan under the given knobs.
    Failed,
}

impl Plan {
    /// Hash used to decide whether two plans are the same.
    pub fn hash(&self) -> PlanHash {
        match self {
            Plan::Explained(text) => PlanHash::of(text.as_bytes()),
            Plan::Failed => PlanHash::failed(),
        }
    }

    /// Returns `true` for the failure sentinel.
    pub fn is_failed(&self) -> bool {
        matches!(self, Plan::Failed)
    }
}

/// 64-bit xxHash of a plan's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanHash(pub u64);

impl PlanHash {
    /// Hashes raw plan bytes.
    pub fn of(bytes: &[u8]) -> Self {
        PlanHash(xxh64(bytes, 0))
    }

    /// Hash of the failure sentinel.
    pub fn failed() -> Self {
        PlanHash::of(FAILED_MARKER)
    }
}

impl fmt::Display for PlanHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:016x}", self.0)
    }
}
