//! Strategies (C7): four selectors over candidate slots. All four consume
//! the same candidate set (suggestions from every eligible engineer) and
//! choose one; they differ only in how they order the chunk queue and how
//! they rank candidates.

use async_trait::async_trait;

use crate::context::PlanningContext;
use crate::types::{DataCenterId, PlanningStrategyKind, SlotSuggestion, Work, WorkChunk, WorkType};

#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> PlanningStrategyKind;

    /// Orders the backlog of `(chunk, work)` pairs into the queue this
    /// strategy processes them in.
    fn sort_chunks(&self, chunks: &mut Vec<(WorkChunk, Work)>);

    /// Picks the single best candidate, or `None` if the list is empty.
    /// `target_dc` is the chunk's effective DC, needed by `Optimal`'s
    /// candidate filter.
    async fn select_best_slot(
        &self,
        ctx: &PlanningContext,
        candidates: Vec<SlotSuggestion>,
        target_dc: Option<DataCenterId>,
    ) -> anyhow::Result<Option<SlotSuggestion>>;
}

pub fn get_strategy(kind: PlanningStrategyKind) -> Box<dyn Strategy> {
    match kind {
        PlanningStrategyKind::Balanced => Box::new(Balanced),
        PlanningStrategyKind::Dense => Box::new(Dense),
        PlanningStrategyKind::Sla => Box::new(Sla),
        PlanningStrategyKind::Optimal => Box::new(Optimal),
    }
}

fn deadline_ordinal(work: &Work) -> i32 {
    work.due_date
        .or(work.target_date)
        .map(|d| d.num_days_from_ce())
        .unwrap_or(i32::MAX)
}

fn is_fixed(work: &Work) -> u8 {
    if work.work_type == WorkType::Support { 0 } else { 1 }
}

/// Shared Balanced selection logic: minimize post-assignment load ratio,
/// tie-break by earliest date. Reused directly by `Optimal`.
async fn balanced_select(
    ctx: &PlanningContext,
    candidates: Vec<SlotSuggestion>,
) -> anyhow::Result<Option<SlotSuggestion>> {
    let mut best: Option<SlotSuggestion> = None;
    let mut best_ratio = f64::INFINITY;

    for candidate in candidates {
        let (used, capacity) = ctx.load(candidate.engineer_id, candidate.date, candidate.date).await?;
        let future_used = used + candidate.duration_hours;
        let ratio = if capacity > 0 {
            future_used as f64 / capacity as f64
        } else {
            1.0
        };

        let take = match &best {
            None => true,
            Some(_) if ratio < best_ratio => true,
            Some(b) if ratio == best_ratio && candidate.date < b.date => true,
            _ => false,
        };
        if take {
            best_ratio = ratio;
            best = Some(candidate);
        }
    }

    Ok(best)
}

pub struct Balanced;

#[async_trait]
impl Strategy for Balanced {
    fn kind(&self) -> PlanningStrategyKind {
        PlanningStrategyKind::Balanced
    }

    fn sort_chunks(&self, chunks: &mut Vec<(WorkChunk, Work)>) {
        chunks.sort_by_key(|(chunk, work)| {
            (is_fixed(work), work.priority.rank(), deadline_ordinal(work), chunk.order)
        });
    }

    async fn select_best_slot(
        &self,
        ctx: &PlanningContext,
        candidates: Vec<SlotSuggestion>,
        _target_dc: Option<DataCenterId>,
    ) -> anyhow::Result<Option<SlotSuggestion>> {
        balanced_select(ctx, candidates).await
    }
}

pub struct Dense;

#[async_trait]
impl Strategy for Dense {
    fn kind(&self) -> PlanningStrategyKind {
        PlanningStrategyKind::Dense
    }

    fn sort_chunks(&self, chunks: &mut Vec<(WorkChunk, Work)>) {
        // Longer chunks first: harder to pack, so they go in while there is
        // still room.
        chunks.sort_by_key(|(chunk, work)| {
            (
                is_fixed(work),
                work.priority.rank(),
                std::cmp::Reverse(chunk.duration_hours),
                chunk.order,
            )
        });
    }

    async fn select_best_slot(
        &self,
        ctx: &PlanningContext,
        candidates: Vec<SlotSuggestion>,
        _target_dc: Option<DataCenterId>,
    ) -> anyhow::Result<Option<SlotSuggestion>> {
        let first = candidates.first().cloned();

        let mut best: Option<SlotSuggestion> = None;
        let mut best_ratio = -1.0f64;

        for candidate in candidates {
            let (used, capacity) = ctx.load(candidate.engineer_id, candidate.date, candidate.date).await?;
            if used + candidate.duration_hours > capacity {
                continue;
            }
            let ratio = if capacity > 0 { used as f64 / capacity as f64 } else { 0.0 };

            let take = match &best {
                None => true,
                Some(_) if ratio > best_ratio => true,
                Some(b) if ratio == best_ratio && candidate.date < b.date => true,
                _ => false,
            };
            if take {
                best_ratio = ratio;
                best = Some(candidate);
            }
        }

        Ok(best.or(first))
    }
}

pub struct Sla;

#[async_trait]
impl Strategy for Sla {
    fn kind(&self) -> PlanningStrategyKind {
        PlanningStrategyKind::Sla
    }

    fn sort_chunks(&self, chunks: &mut Vec<(WorkChunk, Work)>) {
        // Strictly by priority, then deadline: a fixed-date support job does
        // not jump the queue over a critical general one.
        chunks.sort_by_key(|(chunk, work)| (work.priority.rank(), deadline_ordinal(work), chunk.order));
    }

    async fn select_best_slot(
        &self,
        _ctx: &PlanningContext,
        mut candidates: Vec<SlotSuggestion>,
        _target_dc: Option<DataCenterId>,
    ) -> anyhow::Result<Option<SlotSuggestion>> {
        candidates.sort_by_key(|c| (c.date, c.start_hour));
        Ok(candidates.into_iter().next())
    }
}

pub struct Optimal;

#[async_trait]
impl Strategy for Optimal {
    fn kind(&self) -> PlanningStrategyKind {
        PlanningStrategyKind::Optimal
    }

    fn sort_chunks(&self, chunks: &mut Vec<(WorkChunk, Work)>) {
        Balanced.sort_chunks(chunks);
    }

    async fn select_best_slot(
        &self,
        ctx: &PlanningContext,
        candidates: Vec<SlotSuggestion>,
        target_dc: Option<DataCenterId>,
    ) -> anyhow::Result<Option<SlotSuggestion>> {
        let mut affine = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let existing = ctx.engineer_dc_on_date(candidate.engineer_id, candidate.date).await?;
            if existing.is_none() || existing == target_dc {
                affine.push(candidate.clone());
            }
        }

        let preferred = if affine.is_empty() { candidates } else { affine };
        balanced_select(ctx, preferred).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkStatus, Priority, WorkStatus};
    use chrono::NaiveDate;

    fn work(priority: Priority, due_in_days: i64, support: bool) -> Work {
        Work {
            id: uuid::Uuid::new_v4(),
            work_type: if support { WorkType::Support } else { WorkType::General },
            priority,
            status: WorkStatus::Created,
            version: 0,
            data_center_id: None,
            due_date: Some(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(due_in_days)),
            target_date: None,
            target_time: None,
        }
    }

    fn chunk(order: i64) -> WorkChunk {
        WorkChunk {
            id: uuid::Uuid::new_v4(),
            work_id: uuid::Uuid::new_v4(),
            order,
            data_center_id: None,
            status: ChunkStatus::Created,
            version: 0,
            assigned_engineer_id: None,
            assigned_date: None,
            assigned_start_hour: None,
            duration_hours: 2,
        }
    }

    #[test]
    fn sla_strictly_orders_by_priority_over_fixed_date() {
        let mut chunks = vec![
            (chunk(0), work(Priority::Medium, 5, true)),
            (chunk(1), work(Priority::Critical, 10, false)),
        ];
        Sla.sort_chunks(&mut chunks);
        assert_eq!(chunks[0].1.priority, Priority::Critical);
    }

    #[test]
    fn balanced_puts_support_work_first_regardless_of_priority() {
        let mut chunks = vec![
            (chunk(0), work(Priority::Low, 5, true)),
            (chunk(1), work(Priority::Critical, 10, false)),
        ];
        Balanced.sort_chunks(&mut chunks);
        assert!(chunks[0].1.work_type == WorkType::Support);
    }

    #[test]
    fn dense_orders_longer_chunks_first() {
        let mut short = chunk(0);
        short.duration_hours = 2;
        let mut long = chunk(1);
        long.duration_hours = 6;
        let mut chunks = vec![
            (short, work(Priority::Medium, 5, false)),
            (long, work(Priority::Medium, 5, false)),
        ];
        Dense.sort_chunks(&mut chunks);
        assert_eq!(chunks[0].0.duration_hours, 6);
    }
}
