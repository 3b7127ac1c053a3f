//! Persistence ports for flows and their audit history.
//!
//! The storage collaborator is abstracted behind two traits so the
//! orchestrator and handlers can be exercised against the in-memory
//! implementation. The Postgres implementation is the production one.

pub use memory::MemoryStore;
pub use postgres::PgStore;

mod memory;
mod postgres;

use crate::error::AppResult;
use crate::model::{Flow, FlowHead, History};
use async_trait::async_trait;

/// Counts reported by an upsert, mirroring the storage collaborator's
/// update-with-upsert result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertOutcome {
    /// Documents matched by the `(flow_id, user_id)` filter.
    pub matched: u64,
    /// Documents actually changed.
    pub modified: u64,
    /// Documents newly created.
    pub upserted: u64,
}

impl UpsertOutcome {
    /// Whether the write created a new flow rather than updating one.
    pub fn created(&self) -> bool {
        self.upserted > 0
    }
}

impl std::fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "matched {}, modified {}, upserted {}",
            self.matched, self.modified, self.upserted
        )
    }
}

/// Ownership-scoped, uniquely-keyed persistence for flow definitions.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Fetch a flow by identifier. `AppError::NotFound` when absent.
    async fn find_by_id(&self, flow_id: &str) -> AppResult<Flow>;

    /// All flows owned by `user_id`, as head projections.
    async fn list_by_owner(&self, user_id: &str) -> AppResult<Vec<FlowHead>>;

    /// Write keyed by `(flow_id, user_id)`: updates the caller's own
    /// document or creates a new one. A `flow_id` held by another owner
    /// is a conflict, never an overwrite.
    async fn upsert(&self, flow: &Flow) -> AppResult<UpsertOutcome>;

    /// Owner-scoped delete; returns the number of deleted documents.
    async fn delete(&self, flow_id: &str, user_id: &str) -> AppResult<u64>;
}

/// Append-only audit log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, entry: &History) -> AppResult<()>;

    /// Up to `limit` entries for `flow_id`, newest first.
    async fn list(&self, flow_id: &str, limit: i64) -> AppResult<Vec<History>>;
}
