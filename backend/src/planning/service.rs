//! Planning Service (C8): the one stateful orchestrator every HTTP handler
//! goes through. Grounded in `PlanningService` (`app/services/planning/service.py`);
//! each public method below mirrors one of its public methods, with the
//! ambient session/calendar/strategy state it closed over replaced by
//! explicit arguments per call (the re-architecture C9 from SPEC_FULL.md 9).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use calendar::context::{CalendarDataSource, PlanningContext};
use calendar::dependency::LinkDataSource;
use calendar::engine::find_available_slots;
use calendar::strategy::get_strategy;
use calendar::{constraints, types::*};
use planning_session::{FailedAssignment, PlanningSession, PlanningSessionManager, PlanningSessionStore, SessionStats};
use tracing::instrument;

use crate::config::SchedulerConfig;
use crate::db::entities::EntityRepository;
use crate::error::SchedulerError;
use crate::events::{EventBus, SyncEvent, SyncEventKind};
use crate::logger::warn_if_slow;
use crate::time::{now_ms, today};

pub struct PlanningService<S: PlanningSessionStore> {
    entities: Arc<EntityRepository>,
    calendar_data: Arc<dyn CalendarDataSource>,
    links: Arc<dyn LinkDataSource>,
    sessions: Arc<PlanningSessionManager<S>>,
    events: Arc<EventBus>,
    cfg: SchedulerConfig,
}

impl<S: PlanningSessionStore + 'static> PlanningService<S> {
    pub fn new(
        entities: Arc<EntityRepository>,
        calendar_data: Arc<dyn CalendarDataSource>,
        links: Arc<dyn LinkDataSource>,
        sessions: Arc<PlanningSessionManager<S>>,
        events: Arc<EventBus>,
        cfg: SchedulerConfig,
    ) -> Self {
        Self {
            entities,
            calendar_data,
            links,
            sessions,
            events,
            cfg,
        }
    }

    // ================= PUBLIC API =================

    /// Finds a slot without saving anything, always via the Balanced
    /// selector regardless of the work's eventual strategy.
    #[instrument(skip(self))]
    pub async fn suggest_slot(&self, chunk_id: ChunkId) -> Result<SchedulingResult, SchedulerError> {
        let chunk = self.require_chunk(chunk_id).await?;
        let work = self.require_work(chunk.work_id).await?;

        let mut ctx = PlanningContext::new(self.calendar_data.clone());
        ctx.load_global_context().await.map_err(SchedulerError::Internal)?;
        let strategy = get_strategy(PlanningStrategyKind::Balanced);

        let slot = self
            .find_slot_for_chunk(&mut ctx, &chunk, &work, strategy.as_ref(), None)
            .await?;

        Ok(match slot {
            Some(s) => SchedulingResult::ok_with_suggestion(s),
            None => SchedulingResult::failed("no suitable slot found"),
        })
    }

    #[instrument(skip(self))]
    pub async fn assign_chunk(&self, chunk_id: ChunkId) -> Result<SchedulingResult, SchedulerError> {
        let result = self.suggest_slot(chunk_id).await?;
        let Some(suggestion) = result.suggestion.clone() else {
            return Ok(result);
        };
        if !result.success {
            return Ok(result);
        }

        let chunk = self.require_chunk(chunk_id).await?;
        let ok = self
            .entities
            .assign_chunk_cas(chunk_id, chunk.version, suggestion.engineer_id, suggestion.date, suggestion.start_hour)
            .await
            .map_err(SchedulerError::Internal)?;
        if !ok {
            return Err(SchedulerError::Conflict(format!(
                "chunk {chunk_id} was modified concurrently"
            )));
        }

        self.refresh_work_status(chunk.work_id).await?;
        self.events.publish(SyncEvent {
            event_type: SyncEventKind::ChunkAssigned,
            entity_id: chunk_id.to_string(),
            data: serde_json::json!({
                "engineer_id": suggestion.engineer_id,
                "date": suggestion.date,
                "start_hour": suggestion.start_hour,
            }),
            timestamp: chrono::Utc::now(),
            actor_id: None,
        });

        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn unassign_chunk(&self, chunk_id: ChunkId) -> Result<SchedulingResult, SchedulerError> {
        let chunk = self.require_chunk(chunk_id).await?;

        if !matches!(chunk.status, ChunkStatus::Planned | ChunkStatus::Assigned) {
            return Ok(SchedulingResult {
                success: true,
                message: Some("already unassigned".into()),
                ..Default::default()
            });
        }

        let ok = self
            .entities
            .unassign_chunk_cas(chunk_id, chunk.version)
            .await
            .map_err(SchedulerError::Internal)?;
        if !ok {
            return Err(SchedulerError::Conflict(format!(
                "chunk {chunk_id} was modified concurrently"
            )));
        }

        self.refresh_work_status(chunk.work_id).await?;
        self.events.publish(SyncEvent {
            event_type: SyncEventKind::ChunkUnassigned,
            entity_id: chunk_id.to_string(),
            data: serde_json::json!({}),
            timestamp: chrono::Utc::now(),
            actor_id: None,
        });

        Ok(SchedulingResult {
            success: true,
            message: Some("unassigned".into()),
            ..Default::default()
        })
    }

    #[instrument(skip(self))]
    pub async fn assign_all_chunks(
        &self,
        work_id: WorkId,
        strategy_kind: PlanningStrategyKind,
    ) -> Result<SchedulingResult, SchedulerError> {
        let work = self.require_work(work_id).await?;

        let mut ctx = PlanningContext::new(self.calendar_data.clone());
        ctx.load_global_context().await.map_err(SchedulerError::Internal)?;
        let strategy = get_strategy(strategy_kind);

        let all_chunks = self
            .entities
            .list_chunks_for_work(work_id)
            .await
            .map_err(SchedulerError::Internal)?;

        let mut to_assign: Vec<(WorkChunk, Work)> = all_chunks
            .into_iter()
            .filter(|c| c.status == ChunkStatus::Created)
            .map(|c| (c, work.clone()))
            .collect();

        if to_assign.is_empty() {
            return Ok(SchedulingResult {
                success: true,
                message: Some("no chunks to assign".into()),
                ..Default::default()
            });
        }

        strategy.sort_chunks(&mut to_assign);

        let mut assigned_count = 0u32;
        let mut errors = Vec::new();
        let mut run_assignments: Vec<VirtualAssignment> = Vec::new();

        for (chunk, work) in &to_assign {
            let preferred = self.preferred_engineer(work.id, &run_assignments).await?;
            let slot = self
                .find_slot_for_chunk(&mut ctx, chunk, work, strategy.as_ref(), preferred)
                .await?;

            match slot {
                Some(s) => {
                    let ok = self
                        .entities
                        .assign_chunk_cas(chunk.id, chunk.version, s.engineer_id, s.date, s.start_hour)
                        .await
                        .map_err(SchedulerError::Internal)?;
                    if !ok {
                        errors.push(format!("chunk {} was modified concurrently", chunk.id));
                        continue;
                    }

                    assigned_count += 1;
                    let virt = virtual_assignment(chunk, work, &s);
                    ctx.add_virtual_assignment(virt.clone());
                    run_assignments.push(virt);
                }
                None => errors.push(format!("no slot for chunk {}", chunk.id)),
            }
        }

        if assigned_count > 0 {
            self.refresh_work_status(work_id).await?;
            self.events.publish(SyncEvent {
                event_type: SyncEventKind::WorkUpdated,
                entity_id: work_id.to_string(),
                data: serde_json::json!({ "assigned_count": assigned_count }),
                timestamp: chrono::Utc::now(),
                actor_id: None,
            });
        }

        Ok(SchedulingResult {
            success: errors.is_empty(),
            message: Some(format!("assigned {assigned_count} chunks")),
            suggestion: None,
            assigned_count,
            errors,
        })
    }

    /// Builds a draft planning session previewing placements for every
    /// backlog chunk, without writing anything to the persisted calendar.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        user_id: Option<String>,
        strategy_kind: PlanningStrategyKind,
    ) -> Result<PlanningSession, SchedulerError> {
        warn_if_slow("create_planning_session", Duration::from_millis(500), async {
            self.create_session_inner(user_id, strategy_kind).await
        })
        .await
    }

    async fn create_session_inner(
        &self,
        user_id: Option<String>,
        strategy_kind: PlanningStrategyKind,
    ) -> Result<PlanningSession, SchedulerError> {
        let mut ctx = PlanningContext::new(self.calendar_data.clone());
        ctx.load_global_context().await.map_err(SchedulerError::Internal)?;
        let strategy = get_strategy(strategy_kind);

        let mut to_plan = self
            .entities
            .list_unassigned_chunks()
            .await
            .map_err(SchedulerError::Internal)?;
        strategy.sort_chunks(&mut to_plan);

        let mut assignments = Vec::new();
        let mut failed = Vec::new();

        for (chunk, work) in &to_plan {
            let preferred = self.preferred_engineer(work.id, &assignments).await?;
            let slot = self
                .find_slot_for_chunk(&mut ctx, chunk, work, strategy.as_ref(), preferred)
                .await?;

            match slot {
                Some(s) => {
                    let virt = virtual_assignment(chunk, work, &s);
                    ctx.add_virtual_assignment(virt.clone());
                    assignments.push(virt);
                }
                None => failed.push(FailedAssignment {
                    chunk_id: chunk.id,
                    work_id: work.id,
                    reason: "no slot".into(),
                }),
            }
        }

        let stats = SessionStats {
            total: to_plan.len() as u32,
            assigned: assignments.len() as u32,
            failed: failed.len() as u32,
            details: failed,
        };

        let ttl_ms = self.cfg.session_ttl_minutes * 60_000;
        let mut session = self
            .sessions
            .create_session(user_id, strategy_kind, now_ms(), ttl_ms)
            .await
            .map_err(SchedulerError::Internal)?;

        session.assignments = assignments;
        session.stats = stats;
        self.sessions.update(session.clone()).await.map_err(SchedulerError::Internal)?;

        self.events.publish(SyncEvent {
            event_type: SyncEventKind::SessionCreated,
            entity_id: session.id.to_string(),
            data: serde_json::json!({ "total": session.stats.total, "assigned": session.stats.assigned }),
            timestamp: chrono::Utc::now(),
            actor_id: session.user_id.clone(),
        });

        Ok(session)
    }

    /// Writes every still-`created` chunk in the session's preview through to
    /// the persisted calendar, skipping chunks someone else already moved.
    #[instrument(skip(self))]
    pub async fn apply_session(&self, session_id: SessionId) -> Result<SchedulingResult, SchedulerError> {
        let session = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| SchedulerError::NotFound(format!("planning session {session_id}")))?;

        if session.status != PlanningSessionStatus::Draft {
            return Err(SchedulerError::InvalidState(format!(
                "planning session {session_id} is not a draft"
            )));
        }

        let mut applied = 0u32;
        let mut work_ids = HashSet::new();

        for a in &session.assignments {
            let Some(chunk) = self.entities.get_chunk(a.chunk_id).await.map_err(SchedulerError::Internal)? else {
                continue;
            };
            if chunk.status != ChunkStatus::Created {
                continue;
            }

            let ok = self
                .entities
                .assign_chunk_cas(chunk.id, chunk.version, a.engineer_id, a.date, a.start_hour)
                .await
                .map_err(SchedulerError::Internal)?;
            if ok {
                applied += 1;
                work_ids.insert(a.work_id);
            }
        }

        for work_id in &work_ids {
            self.refresh_work_status(*work_id).await?;
        }

        self.sessions
            .set_status(session_id, PlanningSessionStatus::Applied)
            .await
            .map_err(SchedulerError::Internal)?;

        self.events.publish(SyncEvent {
            event_type: SyncEventKind::SessionApplied,
            entity_id: session_id.to_string(),
            data: serde_json::json!({ "applied_count": applied }),
            timestamp: chrono::Utc::now(),
            actor_id: None,
        });

        Ok(SchedulingResult {
            success: true,
            message: Some(format!("applied {applied} assignments")),
            assigned_count: applied,
            ..Default::default()
        })
    }

    /// Cancels a session. If it was already applied, rolls back every
    /// assignment that is still sitting at `planned` (untouched since apply).
    #[instrument(skip(self))]
    pub async fn cancel_session(&self, session_id: SessionId) -> Result<(), SchedulerError> {
        let session = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| SchedulerError::NotFound(format!("planning session {session_id}")))?;

        if session.status == PlanningSessionStatus::Applied {
            let mut work_ids = HashSet::new();
            for a in &session.assignments {
                let Some(chunk) = self.entities.get_chunk(a.chunk_id).await.map_err(SchedulerError::Internal)? else {
                    continue;
                };
                if chunk.status == ChunkStatus::Planned {
                    self.entities
                        .unassign_chunk_cas(chunk.id, chunk.version)
                        .await
                        .map_err(SchedulerError::Internal)?;
                    work_ids.insert(a.work_id);
                }
            }
            for work_id in work_ids {
                self.refresh_work_status(work_id).await?;
            }
        }

        self.sessions
            .set_status(session_id, PlanningSessionStatus::Cancelled)
            .await
            .map_err(SchedulerError::Internal)?;

        self.events.publish(SyncEvent {
            event_type: SyncEventKind::SessionCancelled,
            entity_id: session_id.to_string(),
            data: serde_json::json!({}),
            timestamp: chrono::Utc::now(),
            actor_id: None,
        });

        Ok(())
    }

    /// Sweeps drafts past TTL; called from a background interval in `main.rs`.
    pub async fn expire_due_sessions(&self, now_ms: u64) -> Result<Vec<SessionId>, SchedulerError> {
        self.sessions.expire_due(now_ms).await.map_err(SchedulerError::Internal)
    }

    pub async fn list_sessions(&self) -> Vec<PlanningSession> {
        self.sessions.list().await
    }

    pub async fn get_session(&self, session_id: SessionId) -> Result<PlanningSession, SchedulerError> {
        self.sessions
            .get(session_id)
            .await
            .ok_or_else(|| SchedulerError::NotFound(format!("planning session {session_id}")))
    }

    pub async fn delete_session(&self, session_id: SessionId) -> Result<(), SchedulerError> {
        self.sessions.remove(session_id).await.map_err(SchedulerError::Internal)
    }

    /// Derived constraints for one chunk, used by the UI to validate a
    /// drag-and-drop move before it calls `assign_chunk`. Shares the exact
    /// date-window computation `suggest_slot`/`assign_all_chunks` use
    /// internally, per SPEC_FULL.md's note that C5 and C8 must agree.
    #[instrument(skip(self))]
    pub async fn chunk_constraints(&self, chunk_id: ChunkId) -> Result<ChunkConstraints, SchedulerError> {
        let chunk = self.require_chunk(chunk_id).await?;
        let work = self.require_work(chunk.work_id).await?;

        let mut ctx = PlanningContext::new(self.calendar_data.clone());
        ctx.load_global_context().await.map_err(SchedulerError::Internal)?;

        constraints::calculate(&mut ctx, self.links.as_ref(), &chunk, &work, today(), self.cfg.general_work_window_days)
            .await
            .map_err(SchedulerError::Internal)
    }

    // ================= PRIVATE HELPERS =================

    async fn require_chunk(&self, chunk_id: ChunkId) -> Result<WorkChunk, SchedulerError> {
        self.entities
            .get_chunk(chunk_id)
            .await
            .map_err(SchedulerError::Internal)?
            .ok_or_else(|| SchedulerError::NotFound(format!("chunk {chunk_id}")))
    }

    async fn require_work(&self, work_id: WorkId) -> Result<Work, SchedulerError> {
        self.entities
            .get_work(work_id)
            .await
            .map_err(SchedulerError::Internal)?
            .ok_or_else(|| SchedulerError::NotFound(format!("work {work_id}")))
    }

    /// Finds the single best candidate slot across every candidate engineer,
    /// reusing C5's date-window computation (`_get_date_window` equivalent).
    async fn find_slot_for_chunk(
        &self,
        ctx: &mut PlanningContext,
        chunk: &WorkChunk,
        work: &Work,
        strategy: &dyn calendar::strategy::Strategy,
        preferred_engineer_id: Option<EngineerId>,
    ) -> Result<Option<SlotSuggestion>, SchedulerError> {
        let window = constraints::calculate(ctx, self.links.as_ref(), chunk, work, today(), self.cfg.general_work_window_days)
            .await
            .map_err(SchedulerError::Internal)?;

        let start = window.min_date.unwrap_or_else(today);
        let end = window.max_date.unwrap_or(start);
        let dc_id = chunk.effective_dc(work);

        let engineers = ctx
            .candidate_engineers(dc_id, preferred_engineer_id)
            .await
            .map_err(SchedulerError::Internal)?;
        if engineers.is_empty() {
            return Ok(None);
        }

        let mut candidates = Vec::new();
        for engineer in &engineers {
            let slots = find_available_slots(ctx, engineer, chunk, work, start, end)
                .await
                .map_err(SchedulerError::Internal)?;
            candidates.extend(slots);
        }

        strategy
            .select_best_slot(ctx, candidates, dc_id)
            .await
            .map_err(SchedulerError::Internal)
    }

    async fn preferred_engineer(
        &self,
        work_id: WorkId,
        run_assignments: &[VirtualAssignment],
    ) -> Result<Option<EngineerId>, SchedulerError> {
        if let Some(a) = run_assignments.iter().find(|a| a.work_id == work_id) {
            return Ok(Some(a.engineer_id));
        }
        self.entities
            .preferred_engineer_for_work(work_id)
            .await
            .map_err(SchedulerError::Internal)
    }

    async fn refresh_work_status(&self, work_id: WorkId) -> Result<(), SchedulerError> {
        let work = self.require_work(work_id).await?;
        let chunks = self
            .entities
            .list_chunks_for_work(work_id)
            .await
            .map_err(SchedulerError::Internal)?;
        if chunks.is_empty() {
            return Ok(());
        }

        let statuses: Vec<ChunkStatus> = chunks.iter().map(|c| c.status).collect();
        let new_status = crate::status::derive_work_status(work.status, &statuses);
        if new_status != work.status {
            self.entities
                .update_work_status(work_id, new_status)
                .await
                .map_err(SchedulerError::Internal)?;
        }
        Ok(())
    }
}

fn virtual_assignment(chunk: &WorkChunk, work: &Work, slot: &SlotSuggestion) -> VirtualAssignment {
    VirtualAssignment {
        chunk_id: chunk.id,
        work_id: work.id,
        engineer_id: slot.engineer_id,
        date: slot.date,
        start_hour: slot.start_hour,
        duration_hours: slot.duration_hours,
        dc_id: slot.dc_id,
        priority: slot.priority,
    }
}
