//! `CalendarDataSource` implementation backed by the `works`/`work_chunks`
//! tables, grounded in `PlanningContext`'s SQLAlchemy queries.

use std::collections::HashMap;

use async_trait::async_trait;
use calendar::context::CalendarDataSource;
use calendar::types::{
    DataCenterId, DistanceEntry, Engineer, EngineerId, Hour, OccupiedInterval, RegionId, TimeSlot,
};
use chrono::NaiveDate;
use sqlx::{AnyPool, Row};

use super::entities::EntityRepository;

pub struct SqlxCalendarRepository {
    pool: AnyPool,
    entities: EntityRepository,
}

impl SqlxCalendarRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            entities: EntityRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Chunk statuses that hold a calendar day, rendered as the `IN (...)`
/// fragment used by every occupancy query below.
const OCCUPYING_STATUSES: &str = "'planned', 'assigned', 'in_progress'";

#[async_trait]
impl CalendarDataSource for SqlxCalendarRepository {
    async fn distance_entries(&self) -> anyhow::Result<Vec<DistanceEntry>> {
        let rows = sqlx::query("SELECT * FROM distance_entries")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| {
                let from_str: String = r.get("from_dc");
                let to_str: String = r.get("to_dc");
                Ok(DistanceEntry {
                    from_dc: DataCenterId::parse_str(&from_str)?,
                    to_dc: DataCenterId::parse_str(&to_str)?,
                    duration_minutes: r.get::<i64, _>("duration_minutes") as u32,
                })
            })
            .collect()
    }

    async fn data_center_regions(&self) -> anyhow::Result<HashMap<DataCenterId, RegionId>> {
        let rows = sqlx::query("SELECT id, region_id FROM data_centers")
            .fetch_all(&self.pool)
            .await?;

        let mut out = HashMap::with_capacity(rows.len());
        for r in &rows {
            let id_str: String = r.get("id");
            let region_str: String = r.get("region_id");
            out.insert(DataCenterId::parse_str(&id_str)?, RegionId::parse_str(&region_str)?);
        }
        Ok(out)
    }

    async fn engineers(&self, region_id: Option<RegionId>) -> anyhow::Result<Vec<Engineer>> {
        self.entities.list_engineers_in_region(region_id).await
    }

    async fn engineer_slots(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<TimeSlot>> {
        self.entities.list_time_slots(engineer_id, day).await
    }

    async fn occupied_intervals(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<OccupiedInterval>> {
        let query = format!(
            r#"
SELECT
  c.assigned_start_hour AS start_hour,
  COALESCE(SUM(t.estimated_hours * t.quantity), 0) AS duration,
  COALESCE(c.data_center_id, w.data_center_id) AS effective_dc
FROM work_chunks c
JOIN works w ON w.id = c.work_id
LEFT JOIN work_tasks t ON t.chunk_id = c.id
WHERE c.assigned_engineer_id = ?
  AND c.assigned_date = ?
  AND c.status IN ({OCCUPYING_STATUSES})
GROUP BY c.id
"#
        );

        let rows = sqlx::query(&query)
            .bind(engineer_id.to_string())
            .bind(day.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| {
                let start: Hour = r.get::<i64, _>("start_hour") as Hour;
                let duration: Hour = r.get::<i64, _>("duration") as Hour;
                let dc: Option<String> = r.get("effective_dc");
                Ok(OccupiedInterval {
                    start,
                    end: start + duration,
                    dc_id: dc.map(|s| DataCenterId::parse_str(&s)).transpose()?,
                })
            })
            .collect()
    }

    async fn capacity_hours(
        &self,
        engineer_id: EngineerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<u32> {
        let row = sqlx::query(
            r#"
SELECT COALESCE(SUM(end_hour - start_hour), 0) AS total
FROM time_slots
WHERE engineer_id = ? AND date >= ? AND date <= ?;
"#,
        )
        .bind(engineer_id.to_string())
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("total") as u32)
    }

    async fn used_hours(
        &self,
        engineer_id: EngineerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<u32> {
        let query = format!(
            r#"
SELECT COALESCE(SUM(t.estimated_hours * t.quantity), 0) AS total
FROM work_chunks c
LEFT JOIN work_tasks t ON t.chunk_id = c.id
WHERE c.assigned_engineer_id = ?
  AND c.assigned_date >= ?
  AND c.assigned_date <= ?
  AND c.status IN ({OCCUPYING_STATUSES})
"#
        );

        let row = sqlx::query(&query)
            .bind(engineer_id.to_string())
            .bind(start.to_string())
            .bind(end.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("total") as u32)
    }

    async fn engineer_dc_on_date(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Option<DataCenterId>> {
        let query = format!(
            r#"
SELECT data_center_id
FROM work_chunks
WHERE assigned_engineer_id = ?
  AND assigned_date = ?
  AND data_center_id IS NOT NULL
  AND status IN ({OCCUPYING_STATUSES})
LIMIT 1;
"#
        );

        let row = sqlx::query(&query)
            .bind(engineer_id.to_string())
            .bind(day.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let dc: Option<String> = r.get("data_center_id");
                Ok(dc.map(|s| DataCenterId::parse_str(&s)).transpose()?)
            }
            None => Ok(None),
        }
    }
}
