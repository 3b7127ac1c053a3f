//! Calflow server library.
//!
//! A flow pairs a remote calendar source with an ordered rule tree.
//! Requesting a flow's `.ics` endpoint fetches the source through a
//! time-bounded cache, runs the rule tree over the parsed calendar and
//! returns the mutated result, recording an audit history entry for
//! every execute, update and delete.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod model;
pub mod orchestrator;
pub mod routes;
pub mod source_cache;
pub mod state;
pub mod store;

pub use error::{AppError, AppResult};
pub use state::AppState;
