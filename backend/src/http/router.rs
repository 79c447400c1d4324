//! Routes all bind 1:1 to the `/api` surface; CORS is permissive since the
//! external auth/RBAC layer that would scope it is out of scope here.

use axum::Router;
use axum::extract::Request;
use axum::routing::{delete, get, patch, post};
use planning_session::PlanningSessionStore;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;
use crate::logger::TraceId;

fn make_request_span(request: &Request) -> tracing::Span {
    let trace_id = TraceId::new(uuid::Uuid::new_v4().to_string());
    tracing::info_span!(
        "http_request",
        trace_id = %trace_id.as_str(),
        method = %request.method(),
        uri = %request.uri(),
    )
}

pub fn create_router<S: PlanningSessionStore + 'static>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/works", get(handlers::list_works::<S>).post(handlers::create_work::<S>))
        .route(
            "/works/{work_id}",
            get(handlers::get_work::<S>)
                .patch(handlers::update_work::<S>)
                .delete(handlers::delete_work::<S>),
        )
        .route("/works/{work_id}/chunks", post(handlers::create_chunk::<S>))
        .route(
            "/works/{work_id}/chunks/{chunk_id}",
            patch(handlers::update_chunk::<S>).delete(handlers::delete_chunk::<S>),
        )
        .route(
            "/works/{work_id}/chunks/{chunk_id}/auto-assign",
            post(handlers::auto_assign_chunk::<S>),
        )
        .route(
            "/works/{work_id}/chunks/{chunk_id}/unassign",
            post(handlers::unassign_chunk::<S>),
        )
        .route(
            "/works/{work_id}/chunks/{chunk_id}/suggest-slot",
            get(handlers::suggest_slot::<S>),
        )
        .route(
            "/works/{work_id}/chunks/{chunk_id}/constraints",
            get(handlers::chunk_constraints::<S>),
        )
        .route("/works/{work_id}/auto-assign", post(handlers::auto_assign_work::<S>))
        .route("/works/chunks/confirm-planned", post(handlers::confirm_planned_chunks::<S>))
        .route("/works/{work_id}/cancel-all-chunks", post(handlers::cancel_all_chunks::<S>))
        .route(
            "/planning/sessions",
            get(handlers::list_planning_sessions::<S>).post(handlers::create_planning_session::<S>),
        )
        .route(
            "/planning/sessions/{session_id}",
            get(handlers::get_planning_session::<S>).delete(handlers::delete_planning_session::<S>),
        )
        .route(
            "/planning/sessions/{session_id}/apply",
            post(handlers::apply_planning_session::<S>),
        )
        .route(
            "/planning/sessions/{session_id}/cancel",
            post(handlers::cancel_planning_session::<S>),
        )
        .route("/planning/strategies", get(handlers::list_strategies))
        .route("/sync/stream", get(handlers::sync_stream::<S>));

    Router::new()
        .nest("/api", api)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(cors)
        .with_state(state)
}
