use std::collections::HashMap;

use async_trait::async_trait;
use calendar::dependency::LinkDataSource;
use calendar::types::ChunkId;
use chrono::NaiveDate;
use sqlx::{AnyPool, Row};

use super::entities::EntityRepository;

pub struct SqlxLinkRepository {
    pool: AnyPool,
    entities: EntityRepository,
}

impl SqlxLinkRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            entities: EntityRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl LinkDataSource for SqlxLinkRepository {
    async fn links_touching(&self, chunk: ChunkId) -> anyhow::Result<Vec<calendar::types::ChunkLink>> {
        self.entities.links_touching(chunk).await
    }

    async fn assigned_dates(
        &self,
        chunks: &[ChunkId],
    ) -> anyhow::Result<HashMap<ChunkId, NaiveDate>> {
        if chunks.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; chunks.len()].join(", ");
        let query = format!(
            "SELECT id, assigned_date FROM work_chunks WHERE id IN ({placeholders}) AND assigned_date IS NOT NULL"
        );

        let mut q = sqlx::query(&query);
        for id in chunks {
            q = q.bind(id.to_string());
        }

        let rows = q.fetch_all(&self.pool).await?;

        let mut out = HashMap::with_capacity(rows.len());
        for r in &rows {
            let id_str: String = r.get("id");
            let date_str: String = r.get("assigned_date");
            out.insert(
                ChunkId::parse_str(&id_str)?,
                date_str.parse::<NaiveDate>()?,
            );
        }
        Ok(out)
    }
}
