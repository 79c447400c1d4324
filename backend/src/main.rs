use std::sync::Arc;
use std::time::Duration;

use backend::{
    config::SchedulerConfig,
    db::Db,
    db::calendar_repo::SqlxCalendarRepository,
    db::entities::EntityRepository,
    db::link_repo::SqlxLinkRepository,
    events::EventBus,
    http::{AppState, create_router},
    logger::init_tracing,
    planning::PlanningService,
    time::now_ms,
};
use calendar::context::CalendarDataSource;
use calendar::dependency::LinkDataSource;
use planning_session::{PlanningSessionManager, store::sqlite_store::SqlitePlanningSessionStore};

/// Connects to the database and runs migrations, returning the raw pool the
/// rest of `main` builds repositories on top of.
async fn init_db(cfg: &SchedulerConfig) -> anyhow::Result<Db> {
    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;
    Ok(db)
}

/// Periodically sweeps draft planning sessions past their TTL into `expired`.
fn start_session_expiry_loop<S>(planning: Arc<PlanningService<S>>, interval: Duration)
where
    S: planning_session::PlanningSessionStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match planning.expire_due_sessions(now_ms()).await {
                Ok(expired) if !expired.is_empty() => {
                    tracing::info!(count = expired.len(), "expired stale planning sessions");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "planning session expiry sweep failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting scheduler backend...");

    let cfg = SchedulerConfig::from_env();

    let db = init_db(&cfg).await?;
    let entities = Arc::new(EntityRepository::new((*db.pool).clone()));
    let calendar_data: Arc<dyn CalendarDataSource> =
        Arc::new(SqlxCalendarRepository::new((*db.pool).clone()));
    let links: Arc<dyn LinkDataSource> = Arc::new(SqlxLinkRepository::new((*db.pool).clone()));

    let session_store = Arc::new(SqlitePlanningSessionStore::new(&cfg.database_url).await?);
    let sessions = Arc::new(PlanningSessionManager::new(session_store).await?);

    let events = Arc::new(EventBus::new());

    let planning = Arc::new(PlanningService::new(
        entities.clone(),
        calendar_data,
        links,
        sessions,
        events.clone(),
        cfg.clone(),
    ));

    start_session_expiry_loop(planning.clone(), Duration::from_secs(60));

    let state = AppState::new(entities, planning, events, cfg.clone());
    let app = create_router(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
