//! Execution orchestrator.
//!
//! Sequences one flow operation end to end: lookup, validation, source
//! acquisition, parsing, rule evaluation, audit recording and response
//! assembly. Audit writes are best-effort: whatever the history store
//! does, the caller learns the true outcome of the primary operation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use calflow_engine::{Engine, ExecutionContext, Profile};
use chrono::Utc;
use icalendar::Calendar;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::{Flow, History, HistoryAction, MIN_CACHE_DURATION};
use crate::source_cache::SourceCache;
use crate::store::{FlowStore, HistoryStore, UpsertOutcome};

/// Per-request knobs for an execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Record debug steps in the trace (default true).
    pub debug: bool,
    /// Let the engine narrate its walk (default false).
    pub verbose: bool,
    /// Request origin, recorded in the audit entry.
    pub caller_address: String,
}

/// Result of a successful execution.
#[derive(Debug)]
pub struct ExecutionOutput {
    /// Serialized mutated calendar.
    pub calendar: String,
    /// Ordered debug trace, surfaced as response headers.
    pub debug_messages: Vec<String>,
}

pub struct ExecutionOrchestrator {
    flows: Arc<dyn FlowStore>,
    history: Arc<dyn HistoryStore>,
    cache: Arc<SourceCache>,
    engine: Arc<dyn Engine>,
}

impl ExecutionOrchestrator {
    pub fn new(
        flows: Arc<dyn FlowStore>,
        history: Arc<dyn HistoryStore>,
        cache: Arc<SourceCache>,
        engine: Arc<dyn Engine>,
    ) -> Self {
        Self {
            flows,
            history,
            cache,
            engine,
        }
    }

    /// Run the execution pipeline for one flow.
    pub async fn execute(
        &self,
        flow_id: &str,
        opts: ExecuteOptions,
    ) -> AppResult<ExecutionOutput> {
        let flow = self.flows.find_by_id(flow_id).await?;

        if flow.source.trim().is_empty() {
            return Err(AppError::Validation("`source` required".to_string()));
        }

        let body = self
            .cache
            .get(&flow.source, flow.effective_cache_duration())
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        let mut calendar: Calendar = body.parse().map_err(AppError::ParseCalendar)?;

        let mut ctx = ExecutionContext::new(
            Profile {
                name: flow.name.clone(),
                source: flow.source.clone(),
                cache_duration: flow.effective_cache_duration(),
            },
            opts.debug,
            opts.verbose,
        );

        // Evaluation is the only stage allowed to run third-party rule
        // logic, so panic recovery wraps exactly this call.
        let eval_error: Option<String> = match catch_unwind(AssertUnwindSafe(|| {
            self.engine.evaluate(&mut ctx, &flow.steps, &mut calendar)
        })) {
            Ok(Ok(_signal)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => {
                let message = panic_message(panic);
                tracing::error!(flow_id, message, "recovered panic during rule evaluation");
                Some(message)
            }
        };

        let debug_messages = ctx.debugs;

        self.record(History {
            flow_id: flow_id.to_string(),
            address: opts.caller_address,
            timestamp: Utc::now(),
            success: eval_error.is_none(),
            debug: debug_messages.clone(),
            action: HistoryAction::Execute,
        })
        .await;

        if let Some(message) = eval_error {
            return Err(AppError::Execution(message));
        }

        Ok(ExecutionOutput {
            calendar: calendar.to_string(),
            debug_messages,
        })
    }

    /// Create or update a flow owned by the verified caller.
    ///
    /// The caller-context rules live here: the owner is overwritten with
    /// the verified identity, a missing identifier is generated, and the
    /// cache duration is floored.
    pub async fn upsert_flow(
        &self,
        mut flow: Flow,
        user_id: &str,
        caller_address: String,
    ) -> AppResult<UpsertOutcome> {
        flow.user_id = user_id.to_string();

        if flow.flow_id.is_empty() {
            flow.flow_id = Uuid::new_v4().to_string();
        }

        if flow.cache_duration < MIN_CACHE_DURATION.as_secs() {
            flow.cache_duration = MIN_CACHE_DURATION.as_secs();
        }

        let result = self.flows.upsert(&flow).await;

        let debug = match &result {
            Ok(outcome) => vec![outcome.to_string()],
            Err(_) => vec![],
        };
        self.record(History {
            flow_id: flow.flow_id.clone(),
            address: caller_address,
            timestamp: Utc::now(),
            success: result.is_ok(),
            debug,
            action: HistoryAction::Update,
        })
        .await;

        result
    }

    /// Delete a flow owned by the verified caller.
    pub async fn delete_flow(
        &self,
        flow_id: &str,
        user_id: &str,
        caller_address: String,
    ) -> AppResult<u64> {
        let result = self.flows.delete(flow_id, user_id).await;

        self.record(History {
            flow_id: flow_id.to_string(),
            address: caller_address,
            timestamp: Utc::now(),
            success: result.is_ok(),
            debug: vec![],
            action: HistoryAction::Delete,
        })
        .await;

        result
    }

    /// Best-effort audit write: failures are logged, never propagated.
    async fn record(&self, entry: History) {
        if let Err(e) = self.history.record(&entry).await {
            tracing::warn!(
                error = %e,
                flow_id = %entry.flow_id,
                action = %entry.action,
                "cannot save history entry"
            );
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during rule evaluation".to_string()
    }
}
