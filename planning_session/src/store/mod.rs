pub mod sqlite_store;

use calendar::types::SessionId;

use crate::model::PlanningSession;

#[async_trait::async_trait]
pub trait PlanningSessionStore: Send + Sync {
    async fn load_all(&self) -> anyhow::Result<Vec<PlanningSession>>;
    async fn load(&self, id: SessionId) -> anyhow::Result<Option<PlanningSession>>;
    async fn save(&self, session: &PlanningSession) -> anyhow::Result<()>;
    async fn delete(&self, id: SessionId) -> anyhow::Result<()>;
}
