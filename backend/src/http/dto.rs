//! Request/response JSON shapes. Kept separate from the domain types in
//! `calendar::types` so a wire-format change never forces a signature change
//! through the planning/calendar crates.

use calendar::types::{
    ChunkConstraints, ChunkId, ChunkStatus, DataCenterId, EngineerId, Hour, Priority, RegionId,
    SchedulingResult, SessionId, SlotSuggestion, TaskId, VirtualAssignment, Work, WorkChunk,
    WorkId, WorkStatus, WorkTask, WorkType,
};
use chrono::NaiveDate;
use planning_session::{FailedAssignment, PlanningSession, SessionStats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct WorkCreateRequest {
    pub work_type: WorkType,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub data_center_id: Option<DataCenterId>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_time: Option<Hour>,
}

#[derive(Debug, Deserialize)]
pub struct WorkUpdateRequest {
    pub version: i64,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_time: Option<Hour>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Serialize)]
pub struct WorkResponse {
    pub id: WorkId,
    pub work_type: WorkType,
    pub priority: Priority,
    pub status: WorkStatus,
    pub version: i64,
    pub data_center_id: Option<DataCenterId>,
    pub due_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub target_time: Option<Hour>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<WorkChunkResponse>,
}

impl WorkResponse {
    pub fn bare(w: Work) -> Self {
        Self {
            id: w.id,
            work_type: w.work_type,
            priority: w.priority,
            status: w.status,
            version: w.version,
            data_center_id: w.data_center_id,
            due_date: w.due_date,
            target_date: w.target_date,
            target_time: w.target_time,
            chunks: Vec::new(),
        }
    }

    pub fn with_chunks(w: Work, chunks: Vec<WorkChunkResponse>) -> Self {
        Self { chunks, ..Self::bare(w) }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskInput {
    pub estimated_hours: u32,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ChunkCreateRequest {
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub data_center_id: Option<DataCenterId>,
    #[serde(default)]
    pub tasks: Vec<TaskInput>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkUpdateRequest {
    pub version: i64,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub data_center_id: Option<DataCenterId>,
    #[serde(default)]
    pub status: Option<ChunkStatus>,
}

#[derive(Debug, Serialize)]
pub struct WorkChunkResponse {
    pub id: ChunkId,
    pub work_id: WorkId,
    pub order: i64,
    pub data_center_id: Option<DataCenterId>,
    pub status: ChunkStatus,
    pub version: i64,
    pub assigned_engineer_id: Option<EngineerId>,
    pub assigned_date: Option<NaiveDate>,
    pub assigned_start_hour: Option<Hour>,
    pub duration_hours: u32,
    pub tasks: Vec<WorkTaskResponse>,
}

#[derive(Debug, Serialize)]
pub struct WorkTaskResponse {
    pub id: TaskId,
    pub estimated_hours: u32,
    pub quantity: u32,
}

impl From<WorkTask> for WorkTaskResponse {
    fn from(t: WorkTask) -> Self {
        Self {
            id: t.id,
            estimated_hours: t.estimated_hours,
            quantity: t.quantity,
        }
    }
}

impl WorkChunkResponse {
    pub fn new(chunk: WorkChunk, tasks: Vec<WorkTask>) -> Self {
        Self {
            id: chunk.id,
            work_id: chunk.work_id,
            order: chunk.order,
            data_center_id: chunk.data_center_id,
            status: chunk.status,
            version: chunk.version,
            assigned_engineer_id: chunk.assigned_engineer_id,
            assigned_date: chunk.assigned_date,
            assigned_start_hour: chunk.assigned_start_hour,
            duration_hours: chunk.duration_hours,
            tasks: tasks.into_iter().map(WorkTaskResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlotSuggestionResponse {
    pub engineer_id: EngineerId,
    pub engineer_name: String,
    pub date: NaiveDate,
    pub start_hour: Hour,
    pub end_hour: Hour,
    pub duration_hours: Hour,
    pub dc_id: Option<DataCenterId>,
    pub priority: Priority,
}

impl From<SlotSuggestion> for SlotSuggestionResponse {
    fn from(s: SlotSuggestion) -> Self {
        Self {
            engineer_id: s.engineer_id,
            engineer_name: s.engineer_name,
            date: s.date,
            start_hour: s.start_hour,
            end_hour: s.end_hour,
            duration_hours: s.duration_hours,
            dc_id: s.dc_id,
            priority: s.priority,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SchedulingResultResponse {
    pub success: bool,
    pub message: Option<String>,
    pub suggestion: Option<SlotSuggestionResponse>,
    pub assigned_count: u32,
    pub errors: Vec<String>,
}

impl From<SchedulingResult> for SchedulingResultResponse {
    fn from(r: SchedulingResult) -> Self {
        Self {
            success: r.success,
            message: r.message,
            suggestion: r.suggestion.map(SlotSuggestionResponse::from),
            assigned_count: r.assigned_count,
            errors: r.errors,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChunkConstraintsResponse {
    pub duration_hours: Hour,
    pub data_center_id: Option<DataCenterId>,
    pub allowed_region_ids: Vec<RegionId>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub fixed_date: Option<NaiveDate>,
    pub fixed_time: Option<Hour>,
    pub depends_on_chunk_ids: Vec<ChunkId>,
    pub sync_chunk_ids: Vec<ChunkId>,
}

impl From<ChunkConstraints> for ChunkConstraintsResponse {
    fn from(c: ChunkConstraints) -> Self {
        Self {
            duration_hours: c.duration_hours,
            data_center_id: c.data_center_id,
            allowed_region_ids: c.allowed_region_ids,
            min_date: c.min_date,
            max_date: c.max_date,
            fixed_date: c.fixed_date,
            fixed_time: c.fixed_time,
            depends_on_chunk_ids: c.depends_on_chunk_ids,
            sync_chunk_ids: c.sync_chunk_ids,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AutoAssignWorkRequest {
    #[serde(default)]
    pub strategy: Option<calendar::types::PlanningStrategyKind>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub strategy: Option<calendar::types::PlanningStrategyKind>,
}

#[derive(Debug, Serialize)]
pub struct PlanningSessionResponse {
    pub id: SessionId,
    pub user_id: Option<String>,
    pub strategy: calendar::types::PlanningStrategyKind,
    pub status: calendar::types::PlanningSessionStatus,
    pub assignments: Vec<VirtualAssignment>,
    pub stats: SessionStatsResponse,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionStatsResponse {
    pub total: u32,
    pub assigned: u32,
    pub failed: u32,
    pub details: Vec<FailedAssignment>,
}

impl From<SessionStats> for SessionStatsResponse {
    fn from(s: SessionStats) -> Self {
        Self {
            total: s.total,
            assigned: s.assigned,
            failed: s.failed,
            details: s.details,
        }
    }
}

impl From<PlanningSession> for PlanningSessionResponse {
    fn from(s: PlanningSession) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            strategy: s.strategy,
            status: s.status,
            assignments: s.assignments,
            stats: s.stats.into(),
            created_at_ms: s.created_at_ms,
            expires_at_ms: s.expires_at_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StrategyDescriptor {
    pub key: calendar::types::PlanningStrategyKind,
    pub label: &'static str,
}

pub fn strategy_catalog() -> Vec<StrategyDescriptor> {
    use calendar::types::PlanningStrategyKind::*;
    vec![
        StrategyDescriptor { key: Balanced, label: "Balanced" },
        StrategyDescriptor { key: Dense, label: "Dense (fill first)" },
        StrategyDescriptor { key: Sla, label: "SLA (priority first)" },
        StrategyDescriptor { key: Optimal, label: "Optimal" },
    ]
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl Default for OkResponse {
    fn default() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkCountResponse {
    pub ok: bool,
    pub count: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct ActorQuery {
    #[serde(default)]
    pub actor_id: Option<String>,
}
