//! Shared types for the calendar/scheduling domain.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type RegionId = uuid::Uuid;
pub type DataCenterId = uuid::Uuid;
pub type EngineerId = uuid::Uuid;
pub type WorkId = uuid::Uuid;
pub type ChunkId = uuid::Uuid;
pub type TaskId = uuid::Uuid;
pub type SessionId = uuid::Uuid;

/// An hour-of-day, 0-24. `TimeSlot`/assignment arithmetic is all integer
/// hours; there is no sub-hour granularity anywhere in this domain.
pub type Hour = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Lower rank sorts first. Mirrors the source's `priority_map`.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum WorkType {
    General,
    Support,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum WorkStatus {
    Created,
    Scheduling,
    Assigned,
    InProgress,
    Completed,
    Documented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChunkStatus {
    Created,
    Planned,
    Assigned,
    InProgress,
    Completed,
}

impl ChunkStatus {
    /// Statuses that hold a day of an engineer's calendar.
    pub fn occupies_calendar(self) -> bool {
        matches!(
            self,
            ChunkStatus::Planned | ChunkStatus::Assigned | ChunkStatus::InProgress
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChunkLinkType {
    Sync,
    Dependency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum PlanningStrategyKind {
    Balanced,
    Dense,
    Sla,
    Optimal,
}

impl fmt::Display for PlanningStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanningStrategyKind::Balanced => "balanced",
            PlanningStrategyKind::Dense => "dense",
            PlanningStrategyKind::Sla => "sla",
            PlanningStrategyKind::Optimal => "optimal",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PlanningStrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balanced" => Ok(PlanningStrategyKind::Balanced),
            "dense" | "fill_first" => Ok(PlanningStrategyKind::Dense),
            "sla" | "priority_first" => Ok(PlanningStrategyKind::Sla),
            "optimal" => Ok(PlanningStrategyKind::Optimal),
            other => Err(anyhow::anyhow!("unknown planning strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum PlanningSessionStatus {
    Draft,
    Applied,
    Cancelled,
    Expired,
}

impl fmt::Display for PlanningSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanningSessionStatus::Draft => "draft",
            PlanningSessionStatus::Applied => "applied",
            PlanningSessionStatus::Cancelled => "cancelled",
            PlanningSessionStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PlanningSessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PlanningSessionStatus::Draft),
            "applied" => Ok(PlanningSessionStatus::Applied),
            "cancelled" => Ok(PlanningSessionStatus::Cancelled),
            "expired" => Ok(PlanningSessionStatus::Expired),
            other => Err(anyhow::anyhow!("unknown planning session status: {other}")),
        }
    }
}

/// A half-open `[start_hour, end_hour)` work window for one engineer on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub engineer_id: EngineerId,
    pub date: NaiveDate,
    pub start_hour: Hour,
    pub end_hour: Hour,
}

impl TimeSlot {
    pub fn duration(&self) -> Hour {
        self.end_hour.saturating_sub(self.start_hour)
    }
}

#[derive(Debug, Clone)]
pub struct Engineer {
    pub id: EngineerId,
    pub name: String,
    pub region_id: RegionId,
}

#[derive(Debug, Clone)]
pub struct DataCenter {
    pub id: DataCenterId,
    pub region_id: RegionId,
}

/// A directed `(from_dc, to_dc) -> minutes` travel-time entry.
#[derive(Debug, Clone, Copy)]
pub struct DistanceEntry {
    pub from_dc: DataCenterId,
    pub to_dc: DataCenterId,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct Work {
    pub id: WorkId,
    pub work_type: WorkType,
    pub priority: Priority,
    pub status: WorkStatus,
    pub version: i64,
    pub data_center_id: Option<DataCenterId>,
    pub due_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub target_time: Option<Hour>,
}

#[derive(Debug, Clone)]
pub struct WorkTask {
    pub id: TaskId,
    pub chunk_id: ChunkId,
    pub estimated_hours: u32,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct WorkChunk {
    pub id: ChunkId,
    pub work_id: WorkId,
    pub order: i64,
    pub data_center_id: Option<DataCenterId>,
    pub status: ChunkStatus,
    pub version: i64,
    pub assigned_engineer_id: Option<EngineerId>,
    pub assigned_date: Option<NaiveDate>,
    pub assigned_start_hour: Option<Hour>,
    /// Sum of `estimated_hours * quantity` over this chunk's tasks. Invariant:
    /// >= 1 for any chunk that is assignable.
    pub duration_hours: u32,
}

impl WorkChunk {
    /// The DC to plan against: the chunk's own override, falling back to the
    /// parent work's DC. `None` if neither is set.
    pub fn effective_dc(&self, work: &Work) -> Option<DataCenterId> {
        self.data_center_id.or(work.data_center_id)
    }

    /// All three fields of the assignment triple are null or all are set.
    pub fn assignment_is_consistent(&self) -> bool {
        let all_set = self.assigned_engineer_id.is_some()
            && self.assigned_date.is_some()
            && self.assigned_start_hour.is_some();
        let all_null = self.assigned_engineer_id.is_none()
            && self.assigned_date.is_none()
            && self.assigned_start_hour.is_none();
        all_set || all_null
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkLink {
    pub chunk_id: ChunkId,
    pub linked_chunk_id: ChunkId,
    pub link_type: ChunkLinkType,
}

/// One occupied interval on an engineer's calendar, already resolved to an
/// effective DC. Produced by merging persisted assignments and the
/// in-session virtual overlay.
#[derive(Debug, Clone, Copy)]
pub struct OccupiedInterval {
    pub start: Hour,
    pub end: Hour,
    pub dc_id: Option<DataCenterId>,
}

/// A candidate placement produced by the slot search engine, not yet chosen
/// by a strategy.
#[derive(Debug, Clone)]
pub struct SlotSuggestion {
    pub engineer_id: EngineerId,
    pub engineer_name: String,
    pub date: NaiveDate,
    pub start_hour: Hour,
    pub end_hour: Hour,
    pub duration_hours: Hour,
    pub dc_id: Option<DataCenterId>,
    pub priority: Priority,
}

/// An assignment proposed within one planning run but not yet persisted.
/// Stored both as the session's preview list and as the overlay the
/// calendar view consults for later chunks in the same run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirtualAssignment {
    pub chunk_id: ChunkId,
    pub work_id: WorkId,
    pub engineer_id: EngineerId,
    pub date: NaiveDate,
    pub start_hour: Hour,
    pub duration_hours: Hour,
    pub dc_id: Option<DataCenterId>,
    pub priority: Priority,
}

impl VirtualAssignment {
    pub fn end_hour(&self) -> Hour {
        self.start_hour + self.duration_hours
    }
}

/// Derived, never stored: what the UI needs to validate a drag-and-drop move.
#[derive(Debug, Clone, Default)]
pub struct ChunkConstraints {
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

/// Result of one `suggest_slot`/`assign_chunk` style call. Never an `Err` for
/// "no slot found" — that is a normal, reportable outcome, not a failure of
/// the call itself.
#[derive(Debug, Clone, Default)]
pub struct SchedulingResult {
    pub success: bool,
    pub message: Option<String>,
    pub suggestion: Option<SlotSuggestion>,
    pub assigned_count: u32,
    pub errors: Vec<String>,
}

impl SchedulingResult {
    pub fn ok_with_suggestion(suggestion: SlotSuggestion) -> Self {
        Self {
            success: true,
            suggestion: Some(suggestion),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }
}
