use std::collections::HashMap;
use std::sync::Arc;

use calendar::types::{PlanningSessionStatus, PlanningStrategyKind, SessionId};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::model::{PlanningSession, SessionStats};
use crate::store::PlanningSessionStore;

/// Manages the in-memory live set of planning sessions and persists changes
/// to a store. A session is a draft scratchpad: its `assignments` preview and
/// `stats` are recomputed as chunks are tentatively placed, then either
/// applied (written through to the calendar) or discarded.
pub struct PlanningSessionManager<S: PlanningSessionStore> {
    sessions: Arc<Mutex<HashMap<SessionId, PlanningSession>>>,
    store: Arc<S>,
}

impl<S: PlanningSessionStore> PlanningSessionManager<S> {
    /// Initialize a fresh manager from the store (load_all).
    pub async fn new(store: Arc<S>) -> anyhow::Result<Self> {
        let manager = Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            store,
        };

        manager.restore_from_store().await?;
        Ok(manager)
    }

    async fn restore_from_store(&self) -> anyhow::Result<()> {
        let all = self.store.load_all().await?;
        let mut sessions = self.sessions.lock().await;

        for s in all {
            sessions.insert(s.id, s);
        }

        Ok(())
    }

    pub async fn create_session(
        &self,
        user_id: Option<String>,
        strategy: PlanningStrategyKind,
        now_ms: u64,
        ttl_ms: u64,
    ) -> anyhow::Result<PlanningSession> {
        let session = PlanningSession {
            id: Uuid::new_v4(),
            user_id,
            strategy,
            status: PlanningSessionStatus::Draft,
            assignments: Vec::new(),
            stats: SessionStats::default(),
            created_at_ms: now_ms,
            expires_at_ms: now_ms + ttl_ms,
        };

        self.store.save(&session).await?;

        let mut guard = self.sessions.lock().await;
        guard.insert(session.id, session.clone());

        Ok(session)
    }

    pub async fn get(&self, id: SessionId) -> Option<PlanningSession> {
        let guard = self.sessions.lock().await;
        guard.get(&id).cloned()
    }

    pub async fn list(&self) -> Vec<PlanningSession> {
        let guard = self.sessions.lock().await;
        guard.values().cloned().collect()
    }

    /// Replace the stored session wholesale (e.g. after a chunk is tentatively
    /// placed and the preview/stats are recomputed) and persist it.
    pub async fn update(&self, session: PlanningSession) -> anyhow::Result<()> {
        self.store.save(&session).await?;

        let mut guard = self.sessions.lock().await;
        guard.insert(session.id, session);

        Ok(())
    }

    pub async fn set_status(
        &self,
        id: SessionId,
        status: PlanningSessionStatus,
    ) -> anyhow::Result<PlanningSession> {
        let mut guard = self.sessions.lock().await;
        let s = guard
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("planning session not found"))?;

        s.status = status;
        let updated = s.clone();
        drop(guard);

        self.store.save(&updated).await?;
        Ok(updated)
    }

    /// Drop a session from both the index and the store, regardless of status.
    pub async fn remove(&self, id: SessionId) -> anyhow::Result<()> {
        self.store.delete(id).await?;

        let mut guard = self.sessions.lock().await;
        guard.remove(&id);

        Ok(())
    }

    /// Sweep drafts past their TTL into `Expired`. Only drafts expire:
    /// applied/cancelled sessions are terminal already and left alone so
    /// their preview stays inspectable until the caller deletes them.
    pub async fn expire_due(&self, now_ms: u64) -> anyhow::Result<Vec<SessionId>> {
        let mut guard = self.sessions.lock().await;

        let due: Vec<SessionId> = guard
            .values()
            .filter(|s| s.is_expired(now_ms))
            .map(|s| s.id)
            .collect();

        for id in &due {
            if let Some(s) = guard.get_mut(id) {
                s.status = PlanningSessionStatus::Expired;
            }
        }

        let expired: Vec<PlanningSession> = due
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect();

        drop(guard);

        for s in expired {
            self.store.save(&s).await?;
        }

        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct MockStore {
        data: StdMutex<HashMap<SessionId, PlanningSession>>,
    }

    #[async_trait]
    impl PlanningSessionStore for MockStore {
        async fn load_all(&self) -> anyhow::Result<Vec<PlanningSession>> {
            Ok(self.data.lock().unwrap().values().cloned().collect())
        }

        async fn load(&self, id: SessionId) -> anyhow::Result<Option<PlanningSession>> {
            Ok(self.data.lock().unwrap().get(&id).cloned())
        }

        async fn save(&self, session: &PlanningSession) -> anyhow::Result<()> {
            self.data
                .lock()
                .unwrap()
                .insert(session.id, session.clone());
            Ok(())
        }

        async fn delete(&self, id: SessionId) -> anyhow::Result<()> {
            self.data.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_and_fetch_round_trips() {
        let manager = PlanningSessionManager::new(Arc::new(MockStore::default()))
            .await
            .unwrap();

        let session = manager
            .create_session(Some("alice".into()), PlanningStrategyKind::Balanced, 1_000, 60_000)
            .await
            .unwrap();

        let fetched = manager.get(session.id).await.unwrap();
        assert_eq!(fetched.status, PlanningSessionStatus::Draft);
        assert_eq!(fetched.expires_at_ms, 61_000);
    }

    #[tokio::test]
    async fn draft_past_ttl_expires_but_applied_does_not() {
        let manager = PlanningSessionManager::new(Arc::new(MockStore::default()))
            .await
            .unwrap();

        let draft = manager
            .create_session(None, PlanningStrategyKind::Dense, 0, 1_000)
            .await
            .unwrap();
        let applied = manager
            .create_session(None, PlanningStrategyKind::Dense, 0, 1_000)
            .await
            .unwrap();
        manager
            .set_status(applied.id, PlanningSessionStatus::Applied)
            .await
            .unwrap();

        let due = manager.expire_due(5_000).await.unwrap();
        assert_eq!(due, vec![draft.id]);

        let applied_after = manager.get(applied.id).await.unwrap();
        assert_eq!(applied_after.status, PlanningSessionStatus::Applied);
    }

    #[tokio::test]
    async fn restore_from_store_rebuilds_index() {
        let store = Arc::new(MockStore::default());
        let manager = PlanningSessionManager::new(store.clone()).await.unwrap();
        let session = manager
            .create_session(None, PlanningStrategyKind::Sla, 0, 1_000)
            .await
            .unwrap();

        let restored = PlanningSessionManager::new(store).await.unwrap();
        let fetched = restored.get(session.id).await.unwrap();
        assert_eq!(fetched.id, session.id);
    }
}
