//! SQLitePlanningSessionStore
//! --------------------------
//! SQLite-backed implementation of `PlanningSessionStore`. Responsible for
//! durable persistence of planning sessions so that:
//!
//!  - drafts survive restarts long enough to be applied or to expire
//!  - the computed `assignments`/`stats` preview never needs recomputing
//!  - the in-memory manager can rebuild its index on startup

use std::str::FromStr;

use async_trait::async_trait;
use calendar::types::{PlanningSessionStatus, PlanningStrategyKind, SessionId};
use sqlx::{Row, SqlitePool};

use super::PlanningSessionStore;
use crate::model::{PlanningSession, SessionStats};

pub struct SqlitePlanningSessionStore {
    pool: SqlitePool,
}

impl SqlitePlanningSessionStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn new(path: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(path).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS planning_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                strategy TEXT NOT NULL,
                status TEXT NOT NULL,
                assignments_json TEXT NOT NULL,
                stats_json TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                expires_at_ms INTEGER NOT NULL
            );
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<PlanningSession> {
        let id_str: String = row.get("id");
        let id = SessionId::parse_str(&id_str)?;
        let user_id: Option<String> = row.get("user_id");
        let strategy_str: String = row.get("strategy");
        let strategy = PlanningStrategyKind::from_str(&strategy_str)?;
        let status_str: String = row.get("status");
        let status = PlanningSessionStatus::from_str(&status_str)?;
        let assignments_json: String = row.get("assignments_json");
        let assignments = serde_json::from_str(&assignments_json)?;
        let stats_json: String = row.get("stats_json");
        let stats: SessionStats = serde_json::from_str(&stats_json)?;
        let created_at_ms = row.get::<i64, _>("created_at_ms") as u64;
        let expires_at_ms = row.get::<i64, _>("expires_at_ms") as u64;

        Ok(PlanningSession {
            id,
            user_id,
            strategy,
            status,
            assignments,
            stats,
            created_at_ms,
            expires_at_ms,
        })
    }
}

#[async_trait]
impl PlanningSessionStore for SqlitePlanningSessionStore {
    async fn load_all(&self) -> anyhow::Result<Vec<PlanningSession>> {
        let rows = sqlx::query("SELECT * FROM planning_sessions")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_session).collect()
    }

    async fn load(&self, id: SessionId) -> anyhow::Result<Option<PlanningSession>> {
        let row = sqlx::query("SELECT * FROM planning_sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn save(&self, session: &PlanningSession) -> anyhow::Result<()> {
        let assignments_json = serde_json::to_string(&session.assignments)?;
        let stats_json = serde_json::to_string(&session.stats)?;

        sqlx::query(
            r#"
            INSERT INTO planning_sessions (
                id, user_id, strategy, status,
                assignments_json, stats_json,
                created_at_ms, expires_at_ms
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                strategy = excluded.strategy,
                status = excluded.status,
                assignments_json = excluded.assignments_json,
                stats_json = excluded.stats_json,
                created_at_ms = excluded.created_at_ms,
                expires_at_ms = excluded.expires_at_ms;
        "#,
        )
        .bind(session.id.to_string())
        .bind(&session.user_id)
        .bind(session.strategy.to_string())
        .bind(session.status.to_string())
        .bind(assignments_json)
        .bind(stats_json)
        .bind(session.created_at_ms as i64)
        .bind(session.expires_at_ms as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: SessionId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM planning_sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
