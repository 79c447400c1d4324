//! Constraint Service (C5): derives a `ChunkConstraints` record per chunk
//! for UI validation. Never persisted; recomputed on demand.

use chrono::{Duration, NaiveDate};

use crate::context::PlanningContext;
use crate::dependency::{self, LinkDataSource};
use crate::types::{ChunkConstraints, Work, WorkChunk, WorkType};

/// `work.due_date or today + general_window_days`, the window used when a
/// `general` work has no explicit deadline.
pub async fn calculate(
    ctx: &mut PlanningContext,
    links: &dyn LinkDataSource,
    chunk: &WorkChunk,
    work: &Work,
    today: NaiveDate,
    general_window_days: i64,
) -> anyhow::Result<ChunkConstraints> {
    let dc_id = chunk.effective_dc(work);

    let mut constraints = ChunkConstraints {
        duration_hours: chunk.duration_hours,
        data_center_id: dc_id,
        ..Default::default()
    };

    if let Some(dc) = dc_id {
        if let Some(region) = ctx.region_of(dc).await? {
            constraints.allowed_region_ids = vec![region];
        }
    }

    match work.work_type {
        WorkType::Support => {
            if let Some(target_date) = work.target_date {
                constraints.fixed_date = Some(target_date);
                constraints.min_date = Some(target_date);
                constraints.max_date = Some(target_date);
            }
            constraints.fixed_time = work.target_time;
        }
        WorkType::General => {
            constraints.min_date = Some(today);
            constraints.max_date = Some(
                work.due_date
                    .unwrap_or(today + Duration::days(general_window_days)),
            );
        }
    }

    let dep = dependency::resolve(chunk.id, links).await?;
    constraints.depends_on_chunk_ids = dep.depends_on_ids;
    constraints.sync_chunk_ids = dep.sync_ids;

    if let Some(earliest) = dep.earliest_after_date {
        let should_raise = match constraints.min_date {
            Some(min) => earliest > min,
            None => true,
        };
        if should_raise {
            constraints.min_date = Some(earliest);
        }
    }

    Ok(constraints)
}
