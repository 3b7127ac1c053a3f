//! Domain model: flows and their audit history.
//!
//! JSON field names follow the original wire format (`flow-id`,
//! `cache-duration`, ...). `cache-duration` is in seconds.

use calflow_engine::Flows;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum time between re-fetches of a flow's remote source.
/// Client-supplied values below this are raised to it at write time.
pub const MIN_CACHE_DURATION: Duration = Duration::from_secs(120);

/// A named, user-owned transformation definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    /// Opaque unique identifier; generated when absent on create.
    #[serde(rename = "flow-id", default)]
    pub flow_id: String,

    /// Owning identity. Always set by the server from the verified
    /// caller, never trusted from client input.
    #[serde(rename = "user-id", default)]
    pub user_id: String,

    /// Display label.
    #[serde(default)]
    pub name: String,

    /// URL of the remote calendar to fetch.
    #[serde(default)]
    pub source: String,

    /// Seconds between re-fetches of `source`; floored to
    /// [`MIN_CACHE_DURATION`] at write time.
    #[serde(rename = "cache-duration", default)]
    pub cache_duration: u64,

    /// Ordered rule tree, forwarded verbatim to the engine.
    #[serde(default)]
    pub steps: Flows,
}

impl Flow {
    /// Effective cache duration: the stored value with the floor applied
    /// again defensively at execution time.
    pub fn effective_cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration).max(MIN_CACHE_DURATION)
    }

    /// Reduced projection for listings.
    pub fn head(&self) -> FlowHead {
        FlowHead {
            flow_id: self.flow_id.clone(),
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            source: self.source.clone(),
            cache_duration: self.cache_duration,
        }
    }
}

/// Flow projection omitting the step bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowHead {
    #[serde(rename = "flow-id")]
    pub flow_id: String,

    #[serde(rename = "user-id")]
    pub user_id: String,

    pub name: String,

    pub source: String,

    #[serde(rename = "cache-duration")]
    pub cache_duration: u64,
}

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Execute,
    Update,
    Delete,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Execute => "execute",
            HistoryAction::Update => "update",
            HistoryAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only audit record of one orchestrated operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(rename = "flow-id")]
    pub flow_id: String,

    /// Request origin address.
    pub address: String,

    pub timestamp: DateTime<Utc>,

    pub success: bool,

    /// Debug trace collected during the operation, in order.
    #[serde(default)]
    pub debug: Vec<String>,

    pub action: HistoryAction,
}
