//! PostgreSQL-backed flow and history stores.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::Row;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::model::{Flow, FlowHead, History, HistoryAction};
use crate::store::{FlowStore, HistoryStore, UpsertOutcome};

/// Both stores share the one pool; cloning is cheap.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlowRow {
    flow_id: String,
    user_id: String,
    name: String,
    source: String,
    cache_duration_secs: i64,
    steps: Json<calflow_engine::Flows>,
}

impl From<FlowRow> for Flow {
    fn from(row: FlowRow) -> Self {
        Flow {
            flow_id: row.flow_id,
            user_id: row.user_id,
            name: row.name,
            source: row.source,
            cache_duration: row.cache_duration_secs.max(0) as u64,
            steps: row.steps.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    flow_id: String,
    address: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    success: bool,
    debug: Json<Vec<String>>,
    action: String,
}

impl From<HistoryRow> for History {
    fn from(row: HistoryRow) -> Self {
        History {
            flow_id: row.flow_id,
            address: row.address,
            timestamp: row.timestamp,
            success: row.success,
            debug: row.debug.0,
            action: match row.action.as_str() {
                "update" => HistoryAction::Update,
                "delete" => HistoryAction::Delete,
                _ => HistoryAction::Execute,
            },
        }
    }
}

#[async_trait]
impl FlowStore for PgStore {
    async fn find_by_id(&self, flow_id: &str) -> AppResult<Flow> {
        let row = sqlx::query_as::<_, FlowRow>(
            r#"
            SELECT flow_id, user_id, name, source, cache_duration_secs, steps
            FROM flows
            WHERE flow_id = $1
            "#,
        )
        .bind(flow_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Flow::from)
            .ok_or_else(|| AppError::NotFound(format!("cannot find flow '{flow_id}'")))
    }

    async fn list_by_owner(&self, user_id: &str) -> AppResult<Vec<FlowHead>> {
        let rows = sqlx::query(
            r#"
            SELECT flow_id, user_id, name, source, cache_duration_secs
            FROM flows
            WHERE user_id = $1
            ORDER BY name, flow_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let heads = rows
            .into_iter()
            .map(|row| {
                Ok(FlowHead {
                    flow_id: row.try_get("flow_id")?,
                    user_id: row.try_get("user_id")?,
                    name: row.try_get("name")?,
                    source: row.try_get("source")?,
                    cache_duration: row.try_get::<i64, _>("cache_duration_secs")?.max(0) as u64,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(heads)
    }

    async fn upsert(&self, flow: &Flow) -> AppResult<UpsertOutcome> {
        let steps = Json(&flow.steps);
        let cache_secs = flow.cache_duration as i64;

        // One atomic statement: insert, or update the caller's own row
        // when something actually changed. The WHERE clause keeps the
        // update away from rows held by another owner and from unchanged
        // bodies, so those fall through to the probe below with no row
        // returned. Concurrent writers for the same (flow_id, user_id)
        // serialize on the primary key instead of racing separate
        // statements.
        let row = sqlx::query(
            r#"
            INSERT INTO flows (flow_id, user_id, name, source, cache_duration_secs, steps)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (flow_id) DO UPDATE
            SET name = EXCLUDED.name,
                source = EXCLUDED.source,
                cache_duration_secs = EXCLUDED.cache_duration_secs,
                steps = EXCLUDED.steps
            WHERE flows.user_id = EXCLUDED.user_id
              AND (flows.name, flows.source, flows.cache_duration_secs, flows.steps)
                  IS DISTINCT FROM
                  (EXCLUDED.name, EXCLUDED.source, EXCLUDED.cache_duration_secs, EXCLUDED.steps)
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&flow.flow_id)
        .bind(&flow.user_id)
        .bind(&flow.name)
        .bind(&flow.source)
        .bind(cache_secs)
        .bind(&steps)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let inserted: bool = row.try_get("inserted")?;
            return Ok(if inserted {
                UpsertOutcome {
                    matched: 0,
                    modified: 0,
                    upserted: 1,
                }
            } else {
                UpsertOutcome {
                    matched: 1,
                    modified: 1,
                    upserted: 0,
                }
            });
        }

        // No row written: the id is taken. The caller's own unchanged
        // document is a clean match; anyone else's is a conflict.
        let owner: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM flows WHERE flow_id = $1")
                .bind(&flow.flow_id)
                .fetch_optional(&self.pool)
                .await?;

        match owner {
            Some((owner,)) if owner == flow.user_id => Ok(UpsertOutcome {
                matched: 1,
                modified: 0,
                upserted: 0,
            }),
            Some(_) => Err(AppError::Conflict(format!(
                "flow id '{}' is already in use",
                flow.flow_id
            ))),
            // Row deleted between the write and the probe: nothing was
            // matched, nothing was written.
            None => Ok(UpsertOutcome::default()),
        }
    }

    async fn delete(&self, flow_id: &str, user_id: &str) -> AppResult<u64> {
        let deleted = sqlx::query("DELETE FROM flows WHERE flow_id = $1 AND user_id = $2")
            .bind(flow_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn record(&self, entry: &History) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO history (flow_id, address, timestamp, success, debug, action)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&entry.flow_id)
        .bind(&entry.address)
        .bind(entry.timestamp)
        .bind(entry.success)
        .bind(Json(&entry.debug))
        .bind(entry.action.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, flow_id: &str, limit: i64) -> AppResult<Vec<History>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT flow_id, address, timestamp, success, debug, action
            FROM history
            WHERE flow_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(flow_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(History::from).collect())
    }
}
