use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use calendar::types::{ChunkId, PlanningStrategyKind, WorkId, WorkTask};
use futures::Stream;
use planning_session::PlanningSessionStore;
use uuid::Uuid;

use super::dto::*;
use super::error::AppError;
use super::state::AppState;

type Result<T> = std::result::Result<T, AppError>;

async fn chunk_response<S: PlanningSessionStore>(
    state: &AppState<S>,
    chunk: calendar::types::WorkChunk,
) -> Result<WorkChunkResponse> {
    let tasks: Vec<WorkTask> = state.entities.list_tasks_for_chunk(chunk.id).await?;
    Ok(WorkChunkResponse::new(chunk, tasks))
}

// ===================== Works =====================

pub async fn list_works<S: PlanningSessionStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<WorkResponse>>> {
    let works = state.entities.list_works().await?;
    Ok(Json(works.into_iter().map(WorkResponse::bare).collect()))
}

pub async fn get_work<S: PlanningSessionStore>(
    State(state): State<AppState<S>>,
    Path(work_id): Path<WorkId>,
) -> Result<Json<WorkResponse>> {
    let work = state
        .entities
        .get_work(work_id)
        .await?
        .ok_or_else(|| AppError::from(crate::error::SchedulerError::NotFound(format!("work {work_id}"))))?;

    let chunks = state.entities.list_chunks_for_work(work_id).await?;
    let mut chunk_dtos = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        chunk_dtos.push(chunk_response(&state, chunk).await?);
    }

    Ok(Json(WorkResponse::with_chunks(work, chunk_dtos)))
}

pub async fn create_work<S: PlanningSessionStore>(
    State(state): State<AppState<S>>,
    Json(body): Json<WorkCreateRequest>,
) -> Result<Json<WorkResponse>> {
    let work = calendar::types::Work {
        id: Uuid::new_v4(),
        work_type: body.work_type,
        priority: body.priority.unwrap_or(calendar::types::Priority::Medium),
        status: calendar::types::WorkStatus::Created,
        version: 0,
        data_center_id: body.data_center_id,
        due_date: body.due_date,
        target_date: body.target_date,
        target_time: body.target_time,
    };
    state.entities.create_work(&work).await?;

    state.events.publish(crate::events::SyncEvent {
        event_type: crate::events::SyncEventKind::WorkCreated,
        entity_id: work.id.to_string(),
        data: serde_json::json!({ "work_type": work.work_type }),
        timestamp: chrono::Utc::now(),
        actor_id: None,
    });

    Ok(Json(WorkResponse::bare(work)))
}

pub async fn update_work<S: PlanningSessionStore>(
    State(state): State<AppState<S>>,
    Path(work_id): Path<WorkId>,
    Json(body): Json<WorkUpdateRequest>,
) -> Result<Json<WorkResponse>> {
    let existing = state
        .entities
        .get_work(work_id)
        .await?
        .ok_or_else(|| AppError::from(crate::error::SchedulerError::NotFound(format!("work {work_id}"))))?;

    let ok = state
        .entities
        .update_work_fields(
            work_id,
            body.version,
            body.due_date.or(existing.due_date),
            body.target_date.or(existing.target_date),
            body.target_time.or(existing.target_time),
            body.priority.unwrap_or(existing.priority),
        )
        .await?;
    if !ok {
        return Err(crate::error::SchedulerError::Conflict(format!("work {work_id} was modified concurrently")).into());
    }

    state.events.publish(crate::events::SyncEvent {
        event_type: crate::events::SyncEventKind::WorkUpdated,
        entity_id: work_id.to_string(),
        data: serde_json::json!({}),
        timestamp: chrono::Utc::now(),
        actor_id: None,
    });

    let updated = state
        .entities
        .get_work(work_id)
        .await?
        .ok_or_else(|| AppError::from(crate::error::SchedulerError::NotFound(format!("work {work_id}"))))?;
    Ok(Json(WorkResponse::bare(updated)))
}

pub async fn delete_work<S: PlanningSessionStore>(
    State(state): State<AppState<S>>,
    Path(work_id): Path<WorkId>,
) -> Result<Json<OkResponse>> {
    state.entities.delete_work(work_id).await?;
    state.events.publish(crate::events::SyncEvent {
        event_type: crate::events::SyncEventKind::WorkDeleted,
        entity_id: work_id.to_string(),
        data: serde_json::json!({}),
        timestamp: chrono::Utc::now(),
        actor_id: None,
    });
    Ok(Json(OkResponse::default()))
}

// ===================== Chunks =====================

pub async fn create_chunk<S: PlanningSessionStore>(
    State(state): State<AppState<S>>,
    Path(work_id): Path<WorkId>,
    Json(body): Json<ChunkCreateRequest>,
) -> Result<Json<WorkChunkResponse>> {
    state
        .entities
        .get_work(work_id)
        .await?
        .ok_or_else(|| AppError::from(crate::error::SchedulerError::NotFound(format!("work {work_id}"))))?;

    let chunk = calendar::types::WorkChunk {
        id: Uuid::new_v4(),
        work_id,
        order: body.order,
        data_center_id: body.data_center_id,
        status: calendar::types::ChunkStatus::Created,
        version: 0,
        assigned_engineer_id: None,
        assigned_date: None,
        assigned_start_hour: None,
        duration_hours: 0,
    };
    state.entities.create_chunk(&chunk).await?;

    let mut tasks = Vec::with_capacity(body.tasks.len());
    for t in &body.tasks {
        let task = WorkTask {
            id: Uuid::new_v4(),
            chunk_id: chunk.id,
            estimated_hours: t.estimated_hours,
            quantity: t.quantity,
        };
        state.entities.create_task(&task).await?;
        tasks.push(task);
    }

    let saved = state
        .entities
        .get_chunk(chunk.id)
        .await?
        .expect("chunk just inserted");
    Ok(Json(WorkChunkResponse::new(saved, tasks)))
}

pub async fn update_chunk<S: PlanningSessionStore>(
    State(state): State<AppState<S>>,
    Path((_work_id, chunk_id)): Path<(WorkId, ChunkId)>,
    Json(body): Json<ChunkUpdateRequest>,
) -> Result<Json<WorkChunkResponse>> {
    let existing = state
        .entities
        .get_chunk(chunk_id)
        .await?
        .ok_or_else(|| AppError::from(crate::error::SchedulerError::NotFound(format!("chunk {chunk_id}"))))?;

    if let Some(status) = body.status {
        if status != existing.status {
            return Err(crate::error::SchedulerError::InvalidInput(
                "use auto-assign/unassign to change chunk scheduling status".into(),
            )
            .into());
        }
    }

    // Only the order/data_center_id fields are mutable directly; scheduling
    // fields go through the planning service so the calendar stays consistent.
    let ok = state
        .entities
        .update_chunk_fields_cas(
            chunk_id,
            body.version,
            body.order.unwrap_or(existing.order),
            body.data_center_id.or(existing.data_center_id),
        )
        .await?;
    if !ok {
        return Err(crate::error::SchedulerError::Conflict(format!("chunk {chunk_id} was modified concurrently")).into());
    }

    let updated = state.entities.get_chunk(chunk_id).await?.expect("chunk exists");
    chunk_response(&state, updated).await.map(Json)
}

pub async fn delete_chunk<S: PlanningSessionStore>(
    State(state): State<AppState<S>>,
    Path((_work_id, chunk_id)): Path<(WorkId, ChunkId)>,
) -> Result<Json<OkResponse>> {
    state.entities.delete_chunk(chunk_id).await?;
    Ok(Json(OkResponse::default()))
}

// ===================== Scheduling =====================

pub async fn auto_assign_chunk<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path((_work_id, chunk_id)): Path<(WorkId, ChunkId)>,
) -> Result<Json<SchedulingResultResponse>> {
    let result = state.planning.assign_chunk(chunk_id).await?;
    Ok(Json(result.into()))
}

pub async fn unassign_chunk<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path((_work_id, chunk_id)): Path<(WorkId, ChunkId)>,
) -> Result<Json<SchedulingResultResponse>> {
    let result = state.planning.unassign_chunk(chunk_id).await?;
    Ok(Json(result.into()))
}

pub async fn suggest_slot<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path((_work_id, chunk_id)): Path<(WorkId, ChunkId)>,
) -> Result<Json<SchedulingResultResponse>> {
    let result = state.planning.suggest_slot(chunk_id).await?;
    Ok(Json(result.into()))
}

pub async fn chunk_constraints<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path((_work_id, chunk_id)): Path<(WorkId, ChunkId)>,
) -> Result<Json<ChunkConstraintsResponse>> {
    let constraints = state.planning.chunk_constraints(chunk_id).await?;
    Ok(Json(constraints.into()))
}

pub async fn auto_assign_work<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(work_id): Path<WorkId>,
    body: Option<Json<AutoAssignWorkRequest>>,
) -> Result<Json<SchedulingResultResponse>> {
    let strategy = body
        .and_then(|Json(b)| b.strategy)
        .unwrap_or(PlanningStrategyKind::Balanced);
    let result = state.planning.assign_all_chunks(work_id, strategy).await?;
    Ok(Json(result.into()))
}

pub async fn confirm_planned_chunks<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<BulkCountResponse>> {
    let touched = state.entities.confirm_all_planned_chunks().await?;
    for (chunk_id, _work_id) in &touched {
        state.events.publish(crate::events::SyncEvent {
            event_type: crate::events::SyncEventKind::ChunkStatusChanged,
            entity_id: chunk_id.to_string(),
            data: serde_json::json!({ "status": "assigned" }),
            timestamp: chrono::Utc::now(),
            actor_id: None,
        });
    }
    Ok(Json(BulkCountResponse { ok: true, count: touched.len() as u32 }))
}

pub async fn cancel_all_chunks<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(work_id): Path<WorkId>,
) -> Result<Json<BulkCountResponse>> {
    let touched = state.entities.cancel_chunks_for_work(work_id).await?;
    for chunk_id in &touched {
        state.events.publish(crate::events::SyncEvent {
            event_type: crate::events::SyncEventKind::ChunkUnassigned,
            entity_id: chunk_id.to_string(),
            data: serde_json::json!({}),
            timestamp: chrono::Utc::now(),
            actor_id: None,
        });
    }
    Ok(Json(BulkCountResponse { ok: true, count: touched.len() as u32 }))
}

// ===================== Planning sessions =====================

pub async fn create_planning_session<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<Json<PlanningSessionResponse>> {
    let Json(body) = body.unwrap_or(Json(CreateSessionRequest::default()));
    let strategy = body.strategy.unwrap_or(PlanningStrategyKind::Balanced);
    let session = state.planning.create_session(body.user_id, strategy).await?;
    Ok(Json(session.into()))
}

pub async fn list_planning_sessions<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<Vec<PlanningSessionResponse>> {
    let sessions = state.planning.list_sessions().await;
    Json(sessions.into_iter().map(PlanningSessionResponse::from).collect())
}

pub async fn get_planning_session<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<calendar::types::SessionId>,
) -> Result<Json<PlanningSessionResponse>> {
    let session = state.planning.get_session(session_id).await?;
    Ok(Json(session.into()))
}

pub async fn delete_planning_session<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<calendar::types::SessionId>,
) -> Result<Json<OkResponse>> {
    state.planning.delete_session(session_id).await?;
    Ok(Json(OkResponse::default()))
}

pub async fn apply_planning_session<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<calendar::types::SessionId>,
) -> Result<Json<SchedulingResultResponse>> {
    let result = state.planning.apply_session(session_id).await?;
    Ok(Json(result.into()))
}

pub async fn cancel_planning_session<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<calendar::types::SessionId>,
) -> Result<Json<OkResponse>> {
    state.planning.cancel_session(session_id).await?;
    Ok(Json(OkResponse::default()))
}

pub async fn list_strategies() -> Json<Vec<StrategyDescriptor>> {
    Json(strategy_catalog())
}

// ===================== Sync stream (SSE) =====================

pub async fn sync_stream<S: PlanningSessionStore + 'static>(
    State(state): State<AppState<S>>,
    Query(actor): Query<ActorQuery>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let _ = actor.actor_id;
    let mut rx = state.events.subscribe();
    let keepalive_secs = state.config.sse_keepalive_secs;

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Ok(evt) => {
                            let data = serde_json::to_string(&evt).unwrap_or_default();
                            yield Ok(Event::default().event("sync").data(data));
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(keepalive_secs)) => {
                    yield Ok(Event::default().event("ping").data("{}"));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(keepalive_secs)).text("keep-alive"))
}
