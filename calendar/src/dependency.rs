//! Dependency Resolver (C4): hard predecessors, sync peers, and the
//! earliest feasible / fixed date they impose on a chunk.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::types::{ChunkId, ChunkLink};

#[async_trait]
pub trait LinkDataSource: Send + Sync {
    /// All links with `chunk_id == chunk` (outgoing) or
    /// `linked_chunk_id == chunk` (incoming).
    async fn links_touching(&self, chunk: ChunkId) -> anyhow::Result<Vec<ChunkLink>>;

    /// The persisted `assigned_date` of each chunk id, omitted when unset.
    async fn assigned_dates(
        &self,
        chunks: &[ChunkId],
    ) -> anyhow::Result<std::collections::HashMap<ChunkId, NaiveDate>>;
}

#[derive(Debug, Clone, Default)]
pub struct DependencyInfo {
    pub depends_on_ids: Vec<ChunkId>,
    pub sync_ids: Vec<ChunkId>,
    pub earliest_after_date: Option<NaiveDate>,
    pub sync_pinned_date: Option<NaiveDate>,
}

/// Resolves `chunk`'s predecessors and sync peers from its edges, then
/// derives the date constraints they impose given what is already assigned.
///
/// Edge direction: `chunk --(depends on)--> linked_chunk_id`. An outgoing
/// `dependency` edge means `chunk` depends on `linked_chunk_id`, not the
/// reverse.
pub async fn resolve(
    chunk: ChunkId,
    data: &dyn LinkDataSource,
) -> anyhow::Result<DependencyInfo> {
    use crate::types::ChunkLinkType;

    let links = data.links_touching(chunk).await?;

    let mut depends_on_ids = Vec::new();
    let mut sync_ids = Vec::new();

    for link in &links {
        if link.chunk_id == chunk && link.link_type == ChunkLinkType::Dependency {
            depends_on_ids.push(link.linked_chunk_id);
        }
        if link.link_type == ChunkLinkType::Sync {
            if link.chunk_id == chunk {
                sync_ids.push(link.linked_chunk_id);
            } else if link.linked_chunk_id == chunk {
                sync_ids.push(link.chunk_id);
            }
        }
    }
    sync_ids.sort();
    sync_ids.dedup();

    let mut all_ids = depends_on_ids.clone();
    all_ids.extend(sync_ids.iter().copied());
    let assigned = data.assigned_dates(&all_ids).await?;

    let earliest_after_date = depends_on_ids
        .iter()
        .filter_map(|id| assigned.get(id))
        .max()
        .map(|d| *d + Duration::days(1));

    let sync_pinned_date = sync_ids.iter().filter_map(|id| assigned.get(id)).next().copied();

    Ok(DependencyInfo {
        depends_on_ids,
        sync_ids,
        earliest_after_date,
        sync_pinned_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkLinkType;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeLinks {
        links: Vec<ChunkLink>,
        dates: HashMap<ChunkId, NaiveDate>,
    }

    #[async_trait]
    impl LinkDataSource for FakeLinks {
        async fn links_touching(&self, chunk: ChunkId) -> anyhow::Result<Vec<ChunkLink>> {
            Ok(self
                .links
                .iter()
                .filter(|l| l.chunk_id == chunk || l.linked_chunk_id == chunk)
                .copied()
                .collect())
        }

        async fn assigned_dates(
            &self,
            chunks: &[ChunkId],
        ) -> anyhow::Result<HashMap<ChunkId, NaiveDate>> {
            Ok(self
                .dates
                .iter()
                .filter(|(id, _)| chunks.contains(id))
                .map(|(id, d)| (*id, *d))
                .collect())
        }
    }

    fn id(n: u128) -> ChunkId {
        uuid::Uuid::from_u128(n)
    }

    #[tokio::test]
    async fn dependency_raises_earliest_after_assigned_predecessor() {
        let a = id(1);
        let b = id(2);
        let data = FakeLinks {
            links: vec![ChunkLink {
                chunk_id: b,
                linked_chunk_id: a,
                link_type: ChunkLinkType::Dependency,
            }],
            dates: HashMap::from([(a, NaiveDate::from_ymd_opt(2026, 1, 10).unwrap())]),
        };

        let info = resolve(b, &data).await.unwrap();
        assert_eq!(info.depends_on_ids, vec![a]);
        assert_eq!(
            info.earliest_after_date,
            Some(NaiveDate::from_ymd_opt(2026, 1, 11).unwrap())
        );
    }

    #[tokio::test]
    async fn sync_peers_collected_from_both_directions() {
        let a = id(1);
        let b = id(2);
        let c = id(3);
        let data = FakeLinks {
            links: vec![
                ChunkLink {
                    chunk_id: a,
                    linked_chunk_id: b,
                    link_type: ChunkLinkType::Sync,
                },
                ChunkLink {
                    chunk_id: c,
                    linked_chunk_id: a,
                    link_type: ChunkLinkType::Sync,
                },
            ],
            dates: HashMap::new(),
        };

        let info = resolve(a, &data).await.unwrap();
        assert_eq!(info.sync_ids, vec![b, c]);
    }
}
