use std::sync::Arc;

use planning_session::PlanningSessionStore;

use crate::config::SchedulerConfig;
use crate::db::entities::EntityRepository;
use crate::events::EventBus;
use crate::planning::PlanningService;

/// Shared application state, cloned into every handler. Cheap to clone:
/// every field is an `Arc`. Hand-written `Clone` so cloning `AppState<S>`
/// never requires `S: Clone` (the derive would add that bound even though
/// `S` only ever appears behind an `Arc`).
pub struct AppState<S: PlanningSessionStore> {
    pub entities: Arc<EntityRepository>,
    pub planning: Arc<PlanningService<S>>,
    pub events: Arc<EventBus>,
    pub config: SchedulerConfig,
}

impl<S: PlanningSessionStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            planning: self.planning.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: PlanningSessionStore> AppState<S> {
    pub fn new(
        entities: Arc<EntityRepository>,
        planning: Arc<PlanningService<S>>,
        events: Arc<EventBus>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            entities,
            planning,
            events,
            config,
        }
    }
}
