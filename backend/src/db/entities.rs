//! Row-level CRUD over the work/chunk/task/link tables, shared by the HTTP
//! handlers (full CRUD surface) and by `calendar_repo`/`link_repo` (read-only
//! consumption through the planning traits).

use anyhow::Context;
use calendar::types::{
    ChunkId, ChunkLink, ChunkLinkType, ChunkStatus, DataCenterId, EngineerId, Hour, Priority,
    RegionId, TaskId, TimeSlot, Work, WorkChunk, WorkId, WorkStatus, WorkTask, WorkType,
};
use chrono::NaiveDate;
use sqlx::{AnyPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::time::now_ms;

#[derive(Clone)]
pub struct EntityRepository {
    pool: AnyPool,
}

impl EntityRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    // ===================== Works =====================

    pub async fn list_works(&self) -> anyhow::Result<Vec<Work>> {
        let rows = sqlx::query("SELECT * FROM works").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_work).collect()
    }

    pub async fn get_work(&self, id: WorkId) -> anyhow::Result<Option<Work>> {
        let row = sqlx::query("SELECT * FROM works WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_work).transpose()
    }

    pub async fn create_work(&self, work: &Work) -> anyhow::Result<()> {
        let now = now_ms() as i64;
        sqlx::query(
            r#"
INSERT INTO works (
  id, work_type, priority, status, version,
  data_center_id, due_date, target_date, target_time,
  created_at, updated_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(work.id.to_string())
        .bind(work_type_str(work.work_type))
        .bind(priority_str(work.priority))
        .bind(work_status_str(work.status))
        .bind(work.version)
        .bind(work.data_center_id.map(|d| d.to_string()))
        .bind(work.due_date.map(|d| d.to_string()))
        .bind(work.target_date.map(|d| d.to_string()))
        .bind(work.target_time.map(|t| t as i64))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Optimistic update: only succeeds if `expected_version` still matches.
    pub async fn update_work_status(
        &self,
        id: WorkId,
        new_status: WorkStatus,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE works SET status = ?, updated_at = ? WHERE id = ?")
            .bind(work_status_str(new_status))
            .bind(now_ms() as i64)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_work_fields(
        &self,
        id: WorkId,
        expected_version: i64,
        due_date: Option<NaiveDate>,
        target_date: Option<NaiveDate>,
        target_time: Option<Hour>,
        priority: Priority,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
UPDATE works
SET due_date = ?, target_date = ?, target_time = ?, priority = ?,
    version = version + 1, updated_at = ?
WHERE id = ? AND version = ?;
"#,
        )
        .bind(due_date.map(|d| d.to_string()))
        .bind(target_date.map(|d| d.to_string()))
        .bind(target_time.map(|t| t as i64))
        .bind(priority_str(priority))
        .bind(now_ms() as i64)
        .bind(id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_work(&self, id: WorkId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM work_tasks WHERE chunk_id IN (SELECT id FROM work_chunks WHERE work_id = ?)")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM work_chunks WHERE work_id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM works WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ===================== Chunks =====================

    pub async fn list_chunks_for_work(&self, work_id: WorkId) -> anyhow::Result<Vec<WorkChunk>> {
        let rows = sqlx::query("SELECT * FROM work_chunks WHERE work_id = ? ORDER BY chunk_order")
            .bind(work_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.row_to_chunk(row).await?);
        }
        Ok(out)
    }

    /// Every `created` chunk across all works, paired with its parent work.
    /// Backs the bulk planning-session backlog (`_get_unassigned_chunks`).
    pub async fn list_unassigned_chunks(&self) -> anyhow::Result<Vec<(WorkChunk, Work)>> {
        let rows = sqlx::query("SELECT id FROM work_chunks WHERE status = ?")
            .bind(chunk_status_str(ChunkStatus::Created))
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let id_str: String = row.get("id");
            let chunk_id = ChunkId::parse_str(&id_str)?;
            let Some(chunk) = self.get_chunk(chunk_id).await? else {
                continue;
            };
            let Some(work) = self.get_work(chunk.work_id).await? else {
                continue;
            };
            out.push((chunk, work));
        }
        Ok(out)
    }

    pub async fn get_chunk(&self, id: ChunkId) -> anyhow::Result<Option<WorkChunk>> {
        let row = sqlx::query("SELECT * FROM work_chunks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => Ok(Some(self.row_to_chunk(&r).await?)),
            None => Ok(None),
        }
    }

    async fn row_to_chunk(&self, row: &sqlx::any::AnyRow) -> anyhow::Result<WorkChunk> {
        let id_str: String = row.get("id");
        let id = ChunkId::parse_str(&id_str)?;
        let duration_hours = self.chunk_duration_hours(id).await?;

        let work_id_str: String = row.get("work_id");
        let status_str: String = row.get("status");
        let dc: Option<String> = row.get("data_center_id");
        let assigned_engineer: Option<String> = row.get("assigned_engineer_id");
        let assigned_date: Option<String> = row.get("assigned_date");
        let assigned_start_hour: Option<i64> = row.get("assigned_start_hour");

        Ok(WorkChunk {
            id,
            work_id: WorkId::parse_str(&work_id_str)?,
            order: row.get::<i64, _>("chunk_order"),
            data_center_id: dc.map(|s| DataCenterId::parse_str(&s)).transpose()?,
            status: chunk_status_from_str(&status_str)?,
            version: row.get::<i64, _>("version"),
            assigned_engineer_id: assigned_engineer
                .map(|s| EngineerId::parse_str(&s))
                .transpose()?,
            assigned_date: assigned_date
                .map(|s| NaiveDate::from_str(&s))
                .transpose()
                .context("invalid assigned_date")?,
            assigned_start_hour: assigned_start_hour.map(|h| h as Hour),
            duration_hours,
        })
    }

    pub async fn chunk_duration_hours(&self, chunk_id: ChunkId) -> anyhow::Result<u32> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(estimated_hours * quantity), 0) AS total FROM work_tasks WHERE chunk_id = ?",
        )
        .bind(chunk_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("total") as u32)
    }

    pub async fn create_chunk(&self, chunk: &WorkChunk) -> anyhow::Result<()> {
        let now = now_ms() as i64;
        sqlx::query(
            r#"
INSERT INTO work_chunks (
  id, work_id, chunk_order, data_center_id, status, version,
  assigned_engineer_id, assigned_date, assigned_start_hour,
  created_at, updated_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(chunk.id.to_string())
        .bind(chunk.work_id.to_string())
        .bind(chunk.order)
        .bind(chunk.data_center_id.map(|d| d.to_string()))
        .bind(chunk_status_str(chunk.status))
        .bind(chunk.version)
        .bind(chunk.assigned_engineer_id.map(|e| e.to_string()))
        .bind(chunk.assigned_date.map(|d| d.to_string()))
        .bind(chunk.assigned_start_hour.map(|h| h as i64))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_chunk(&self, id: ChunkId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM work_tasks WHERE chunk_id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM chunk_links WHERE chunk_id = ? OR linked_chunk_id = ?")
            .bind(id.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM work_chunks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// CAS assignment write: only succeeds if `version` still matches what
    /// the caller last read. `rows_affected() != 1` means someone else moved
    /// this chunk first.
    pub async fn assign_chunk_cas(
        &self,
        chunk_id: ChunkId,
        expected_version: i64,
        engineer_id: EngineerId,
        date: NaiveDate,
        start_hour: Hour,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
UPDATE work_chunks
SET assigned_engineer_id = ?, assigned_date = ?, assigned_start_hour = ?,
    status = ?, version = version + 1, updated_at = ?
WHERE id = ? AND version = ?;
"#,
        )
        .bind(engineer_id.to_string())
        .bind(date.to_string())
        .bind(start_hour as i64)
        .bind(chunk_status_str(ChunkStatus::Planned))
        .bind(now_ms() as i64)
        .bind(chunk_id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// CAS update of the two directly-editable chunk fields (order, DC
    /// override). Scheduling fields go through `assign_chunk_cas`/
    /// `unassign_chunk_cas` instead so the calendar stays consistent.
    pub async fn update_chunk_fields_cas(
        &self,
        chunk_id: ChunkId,
        expected_version: i64,
        order: i64,
        data_center_id: Option<DataCenterId>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE work_chunks SET chunk_order = ?, data_center_id = ?, version = version + 1, updated_at = ? WHERE id = ? AND version = ?",
        )
        .bind(order)
        .bind(data_center_id.map(|d| d.to_string()))
        .bind(now_ms() as i64)
        .bind(chunk_id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn unassign_chunk_cas(
        &self,
        chunk_id: ChunkId,
        expected_version: i64,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
UPDATE work_chunks
SET assigned_engineer_id = NULL, assigned_date = NULL, assigned_start_hour = NULL,
    status = ?, version = version + 1, updated_at = ?
WHERE id = ? AND version = ?;
"#,
        )
        .bind(chunk_status_str(ChunkStatus::Created))
        .bind(now_ms() as i64)
        .bind(chunk_id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Bulk-confirms every `planned` chunk system-wide to `assigned`.
    /// Grounded in the original's `confirm_planned_chunks` bulk endpoint,
    /// which is a direct status flip with no CAS check (nothing else can
    /// be racing a `planned` chunk except another confirm sweep).
    pub async fn confirm_all_planned_chunks(&self) -> anyhow::Result<Vec<(ChunkId, WorkId)>> {
        let rows = sqlx::query("SELECT id, work_id FROM work_chunks WHERE status = ?")
            .bind(chunk_status_str(ChunkStatus::Planned))
            .fetch_all(&self.pool)
            .await?;

        let mut touched = Vec::with_capacity(rows.len());
        for row in &rows {
            let id_str: String = row.get("id");
            let work_id_str: String = row.get("work_id");
            touched.push((ChunkId::parse_str(&id_str)?, WorkId::parse_str(&work_id_str)?));
        }

        if !touched.is_empty() {
            sqlx::query("UPDATE work_chunks SET status = ?, version = version + 1, updated_at = ? WHERE status = ?")
                .bind(chunk_status_str(ChunkStatus::Assigned))
                .bind(now_ms() as i64)
                .bind(chunk_status_str(ChunkStatus::Planned))
                .execute(&self.pool)
                .await?;
        }

        Ok(touched)
    }

    /// Bulk-cancels every `planned`/`assigned` chunk of one work back to
    /// `created`, clearing its assignment triple. Grounded in the
    /// original's `cancel_all_chunks` endpoint.
    pub async fn cancel_chunks_for_work(&self, work_id: WorkId) -> anyhow::Result<Vec<ChunkId>> {
        let rows = sqlx::query(
            "SELECT id FROM work_chunks WHERE work_id = ? AND status IN (?, ?)",
        )
        .bind(work_id.to_string())
        .bind(chunk_status_str(ChunkStatus::Planned))
        .bind(chunk_status_str(ChunkStatus::Assigned))
        .fetch_all(&self.pool)
        .await?;

        let mut touched = Vec::with_capacity(rows.len());
        for row in &rows {
            let id_str: String = row.get("id");
            touched.push(ChunkId::parse_str(&id_str)?);
        }

        if !touched.is_empty() {
            sqlx::query(
                r#"
UPDATE work_chunks
SET status = ?, assigned_engineer_id = NULL, assigned_date = NULL, assigned_start_hour = NULL,
    version = version + 1, updated_at = ?
WHERE work_id = ? AND status IN (?, ?);
"#,
            )
            .bind(chunk_status_str(ChunkStatus::Created))
            .bind(now_ms() as i64)
            .bind(work_id.to_string())
            .bind(chunk_status_str(ChunkStatus::Planned))
            .bind(chunk_status_str(ChunkStatus::Assigned))
            .execute(&self.pool)
            .await?;
        }

        Ok(touched)
    }

    // ===================== Tasks =====================

    pub async fn create_task(&self, task: &WorkTask) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO work_tasks (id, chunk_id, estimated_hours, quantity) VALUES (?, ?, ?, ?);",
        )
        .bind(task.id.to_string())
        .bind(task.chunk_id.to_string())
        .bind(task.estimated_hours as i64)
        .bind(task.quantity as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_tasks_for_chunk(&self, chunk_id: ChunkId) -> anyhow::Result<Vec<WorkTask>> {
        let rows = sqlx::query("SELECT * FROM work_tasks WHERE chunk_id = ?")
            .bind(chunk_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| {
                let id_str: String = r.get("id");
                let chunk_id_str: String = r.get("chunk_id");
                Ok(WorkTask {
                    id: TaskId::parse_str(&id_str)?,
                    chunk_id: ChunkId::parse_str(&chunk_id_str)?,
                    estimated_hours: r.get::<i64, _>("estimated_hours") as u32,
                    quantity: r.get::<i64, _>("quantity") as u32,
                })
            })
            .collect()
    }

    // ===================== Links =====================

    pub async fn create_link(&self, link: &ChunkLink) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO chunk_links (chunk_id, linked_chunk_id, link_type) VALUES (?, ?, ?);",
        )
        .bind(link.chunk_id.to_string())
        .bind(link.linked_chunk_id.to_string())
        .bind(link_type_str(link.link_type))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_link(&self, link: &ChunkLink) -> anyhow::Result<()> {
        sqlx::query(
            "DELETE FROM chunk_links WHERE chunk_id = ? AND linked_chunk_id = ? AND link_type = ?;",
        )
        .bind(link.chunk_id.to_string())
        .bind(link.linked_chunk_id.to_string())
        .bind(link_type_str(link.link_type))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn links_touching(&self, chunk_id: ChunkId) -> anyhow::Result<Vec<ChunkLink>> {
        let rows = sqlx::query(
            "SELECT * FROM chunk_links WHERE chunk_id = ? OR linked_chunk_id = ?",
        )
        .bind(chunk_id.to_string())
        .bind(chunk_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let chunk_id_str: String = r.get("chunk_id");
                let linked_str: String = r.get("linked_chunk_id");
                let link_type_str: String = r.get("link_type");
                Ok(ChunkLink {
                    chunk_id: ChunkId::parse_str(&chunk_id_str)?,
                    linked_chunk_id: ChunkId::parse_str(&linked_str)?,
                    link_type: link_type_from_str(&link_type_str)?,
                })
            })
            .collect()
    }

    // ===================== Reference data (regions/DCs/engineers/slots) =====================

    pub async fn list_engineers_in_region(
        &self,
        region_id: Option<RegionId>,
    ) -> anyhow::Result<Vec<calendar::types::Engineer>> {
        let rows = match region_id {
            Some(r) => {
                sqlx::query("SELECT * FROM engineers WHERE region_id = ?")
                    .bind(r.to_string())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => sqlx::query("SELECT * FROM engineers").fetch_all(&self.pool).await?,
        };

        rows.iter()
            .map(|r| {
                let id_str: String = r.get("id");
                let region_str: String = r.get("region_id");
                Ok(calendar::types::Engineer {
                    id: EngineerId::parse_str(&id_str)?,
                    name: r.get::<String, _>("name"),
                    region_id: RegionId::parse_str(&region_str)?,
                })
            })
            .collect()
    }

    /// Any engineer already assigned a chunk of this work, persisted store
    /// only (the run's own virtual overlay is checked by the caller first).
    pub async fn preferred_engineer_for_work(
        &self,
        work_id: WorkId,
    ) -> anyhow::Result<Option<EngineerId>> {
        let row = sqlx::query(
            "SELECT assigned_engineer_id FROM work_chunks WHERE work_id = ? AND assigned_engineer_id IS NOT NULL LIMIT 1",
        )
        .bind(work_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let id: Option<String> = r.get("assigned_engineer_id");
                Ok(id.map(|s| EngineerId::parse_str(&s)).transpose()?)
            }
            None => Ok(None),
        }
    }

    pub async fn list_time_slots(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<TimeSlot>> {
        let rows = sqlx::query("SELECT * FROM time_slots WHERE engineer_id = ? AND date = ?")
            .bind(engineer_id.to_string())
            .bind(day.to_string())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|r| TimeSlot {
                engineer_id,
                date: day,
                start_hour: r.get::<i64, _>("start_hour") as Hour,
                end_hour: r.get::<i64, _>("end_hour") as Hour,
            })
            .collect())
    }
}

// ===================== Enum <-> TEXT mapping =====================

fn work_type_str(t: WorkType) -> &'static str {
    match t {
        WorkType::General => "general",
        WorkType::Support => "support",
    }
}

fn priority_str(p: Priority) -> &'static str {
    match p {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
        Priority::Critical => "critical",
    }
}

fn work_status_str(s: WorkStatus) -> &'static str {
    match s {
        WorkStatus::Created => "created",
        WorkStatus::Scheduling => "scheduling",
        WorkStatus::Assigned => "assigned",
        WorkStatus::InProgress => "in_progress",
        WorkStatus::Completed => "completed",
        WorkStatus::Documented => "documented",
    }
}

fn chunk_status_str(s: ChunkStatus) -> &'static str {
    match s {
        ChunkStatus::Created => "created",
        ChunkStatus::Planned => "planned",
        ChunkStatus::Assigned => "assigned",
        ChunkStatus::InProgress => "in_progress",
        ChunkStatus::Completed => "completed",
    }
}

fn chunk_status_from_str(s: &str) -> anyhow::Result<ChunkStatus> {
    Ok(match s {
        "created" => ChunkStatus::Created,
        "planned" => ChunkStatus::Planned,
        "assigned" => ChunkStatus::Assigned,
        "in_progress" => ChunkStatus::InProgress,
        "completed" => ChunkStatus::Completed,
        other => anyhow::bail!("unknown chunk status: {other}"),
    })
}

fn link_type_str(t: ChunkLinkType) -> &'static str {
    match t {
        ChunkLinkType::Sync => "sync",
        ChunkLinkType::Dependency => "dependency",
    }
}

fn link_type_from_str(s: &str) -> anyhow::Result<ChunkLinkType> {
    Ok(match s {
        "sync" => ChunkLinkType::Sync,
        "dependency" => ChunkLinkType::Dependency,
        other => anyhow::bail!("unknown link type: {other}"),
    })
}

fn row_to_work(row: &sqlx::any::AnyRow) -> anyhow::Result<Work> {
    let id_str: String = row.get("id");
    let work_type_str: String = row.get("work_type");
    let priority_str: String = row.get("priority");
    let status_str: String = row.get("status");
    let dc: Option<String> = row.get("data_center_id");
    let due_date: Option<String> = row.get("due_date");
    let target_date: Option<String> = row.get("target_date");
    let target_time: Option<i64> = row.get("target_time");

    Ok(Work {
        id: Uuid::parse_str(&id_str).context("invalid work id")?,
        work_type: match work_type_str.as_str() {
            "general" => WorkType::General,
            "support" => WorkType::Support,
            other => anyhow::bail!("unknown work_type: {other}"),
        },
        priority: match priority_str.as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "critical" => Priority::Critical,
            other => anyhow::bail!("unknown priority: {other}"),
        },
        status: match status_str.as_str() {
            "created" => WorkStatus::Created,
            "scheduling" => WorkStatus::Scheduling,
            "assigned" => WorkStatus::Assigned,
            "in_progress" => WorkStatus::InProgress,
            "completed" => WorkStatus::Completed,
            "documented" => WorkStatus::Documented,
            other => anyhow::bail!("unknown work status: {other}"),
        },
        version: row.get::<i64, _>("version"),
        data_center_id: dc.map(|s| DataCenterId::parse_str(&s)).transpose()?,
        due_date: due_date.map(|s| NaiveDate::from_str(&s)).transpose()?,
        target_date: target_date.map(|s| NaiveDate::from_str(&s)).transpose()?,
        target_time: target_time.map(|t| t as Hour),
    })
}
