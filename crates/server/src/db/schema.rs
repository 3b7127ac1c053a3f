//! Startup schema bootstrap.
//!
//! Creates the two collections on first start. The primary key on
//! `flow_id` is the store-wide uniqueness guarantee for flow
//! identifiers; history is queried per flow, newest first, so it gets
//! a matching compound index.

use crate::db::DbPool;

pub async fn ensure_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS flows (
            flow_id             TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL,
            name                TEXT NOT NULL DEFAULT '',
            source              TEXT NOT NULL DEFAULT '',
            cache_duration_secs BIGINT NOT NULL DEFAULT 120,
            steps               JSONB NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS flows_user_id_idx ON flows (user_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id        BIGSERIAL PRIMARY KEY,
            flow_id   TEXT NOT NULL,
            address   TEXT NOT NULL DEFAULT '',
            timestamp TIMESTAMPTZ NOT NULL,
            success   BOOLEAN NOT NULL,
            debug     JSONB NOT NULL DEFAULT '[]',
            action    TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS history_flow_timestamp_idx ON history (flow_id, timestamp DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database schema ensured");
    Ok(())
}
