//! Shared application state passed to all handlers.

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::orchestrator::ExecutionOrchestrator;
use crate::store::{FlowStore, HistoryStore};

/// Shared application state.
///
/// Handlers reach the orchestrator for the three audited operations and
/// the stores directly for plain reads.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ExecutionOrchestrator>,
    pub flows: Arc<dyn FlowStore>,
    pub history: Arc<dyn HistoryStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<ExecutionOrchestrator>,
        flows: Arc<dyn FlowStore>,
        history: Arc<dyn HistoryStore>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            orchestrator,
            flows,
            history,
            verifier,
            start_time: std::time::Instant::now(),
        }
    }

    /// Server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
