#![forbid(unsafe_code)]

//! Interface to the optimizer being steered.
//!
//! The engine never talks to a database directly. It asks a
//! [`ConnectorFactory`] for the knob catalogue and for fresh [`Connector`]
//! sessions, one per explain, so differently configured sessions never share
//! state.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::plan::Plan;

mod fixture;

/// Offline connector replaying recorded explains.
pub use fixture::{FixtureCatalog, FixtureConnector, FixtureFactory};

/// One optimizer session.
pub trait Connector {
    /// Disables exactly `knobs` for subsequent explains. Calling it again with
    /// the same set has no further effect.
    fn set_disabled_knobs(&mut self, knobs: &BTreeSet<String>) -> Result<()>;

    /// Explains `sql` without executing it.
    ///
    /// An optimizer that cannot plan the query must return [`Plan::Failed`];
    /// `Err` is reserved for transport and connection faults.
    fn explain(&mut self, sql: &str) -> Result<Plan>;
}

/// Builds connector sessions. Shared by all explain workers.
pub trait ConnectorFactory: Sync {
    /// Session type produced by [`connect`](Self::connect).
    type Connector: Connector;

    /// Every knob the optimizer lets us disable.
    fn knobs(&self) -> Result<Vec<String>>;

    /// Opens a fresh session. Failure here aborts the search.
    fn connect(&self) -> Result<Self::Connector>;
}
