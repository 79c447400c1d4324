use calendar::types::{ChunkId, PlanningSessionStatus, PlanningStrategyKind, SessionId, VirtualAssignment, WorkId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailedAssignment {
    pub chunk_id: ChunkId,
    pub work_id: WorkId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionStats {
    pub total: u32,
    pub assigned: u32,
    pub failed: u32,
    pub details: Vec<FailedAssignment>,
}

#[derive(Debug, Clone)]
pub struct PlanningSession {
    pub id: SessionId,
    pub user_id: Option<String>,
    pub strategy: PlanningStrategyKind,
    pub status: PlanningSessionStatus,
    pub assignments: Vec<VirtualAssignment>,
    pub stats: SessionStats,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl PlanningSession {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.status == PlanningSessionStatus::Draft && now_ms >= self.expires_at_ms
    }
}
