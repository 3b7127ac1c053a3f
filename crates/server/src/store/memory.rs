//! In-memory flow and history stores.
//!
//! Mirrors the Postgres implementation's semantics, including the
//! uniqueness guarantee on flow identifiers and the owner-scoped upsert
//! filter. Used by tests and handy for running without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::model::{Flow, FlowHead, History};
use crate::store::{FlowStore, HistoryStore, UpsertOutcome};

#[derive(Default)]
pub struct MemoryStore {
    flows: RwLock<HashMap<String, Flow>>,
    history: RwLock<Vec<History>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStore for MemoryStore {
    async fn find_by_id(&self, flow_id: &str) -> AppResult<Flow> {
        self.flows
            .read()
            .await
            .get(flow_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("cannot find flow '{flow_id}'")))
    }

    async fn list_by_owner(&self, user_id: &str) -> AppResult<Vec<FlowHead>> {
        let flows = self.flows.read().await;
        let mut heads: Vec<FlowHead> = flows
            .values()
            .filter(|f| f.user_id == user_id)
            .map(Flow::head)
            .collect();
        heads.sort_by(|a, b| (&a.name, &a.flow_id).cmp(&(&b.name, &b.flow_id)));
        Ok(heads)
    }

    async fn upsert(&self, flow: &Flow) -> AppResult<UpsertOutcome> {
        let mut flows = self.flows.write().await;

        match flows.get_mut(&flow.flow_id) {
            Some(existing) if existing.user_id == flow.user_id => {
                if existing == flow {
                    Ok(UpsertOutcome {
                        matched: 1,
                        modified: 0,
                        upserted: 0,
                    })
                } else {
                    *existing = flow.clone();
                    Ok(UpsertOutcome {
                        matched: 1,
                        modified: 1,
                        upserted: 0,
                    })
                }
            }
            Some(_) => Err(AppError::Conflict(format!(
                "flow id '{}' is already in use",
                flow.flow_id
            ))),
            None => {
                flows.insert(flow.flow_id.clone(), flow.clone());
                Ok(UpsertOutcome {
                    matched: 0,
                    modified: 0,
                    upserted: 1,
                })
            }
        }
    }

    async fn delete(&self, flow_id: &str, user_id: &str) -> AppResult<u64> {
        let mut flows = self.flows.write().await;
        match flows.get(flow_id) {
            Some(existing) if existing.user_id == user_id => {
                flows.remove(flow_id);
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn record(&self, entry: &History) -> AppResult<()> {
        self.history.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(&self, flow_id: &str, limit: i64) -> AppResult<Vec<History>> {
        let history = self.history.read().await;
        let mut entries: Vec<History> = history
            .iter()
            .filter(|h| h.flow_id == flow_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}
