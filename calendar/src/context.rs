//! Calendar View (C3): merges persisted chunk assignments with the
//! in-session virtual-assignment overlay to answer "what is engineer E
//! doing on day D?". Also owns the Distance Oracle (C2) snapshot for the
//! duration of one planning call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::distance::DistanceOracle;
use crate::types::{
    DataCenterId, DistanceEntry, Engineer, EngineerId, Hour, OccupiedInterval, RegionId, TimeSlot,
    VirtualAssignment,
};

/// Everything a planning run needs to read from persistent storage.
/// Implemented against the database by the owning service; this crate only
/// consumes it, so the slot search engine and strategies stay free of any
/// persistence concern.
#[async_trait]
pub trait CalendarDataSource: Send + Sync {
    async fn distance_entries(&self) -> anyhow::Result<Vec<DistanceEntry>>;
    async fn data_center_regions(&self) -> anyhow::Result<HashMap<DataCenterId, RegionId>>;

    /// All engineers, optionally filtered to one region.
    async fn engineers(&self, region_id: Option<RegionId>) -> anyhow::Result<Vec<Engineer>>;

    async fn engineer_slots(&self, engineer_id: EngineerId, day: NaiveDate)
        -> anyhow::Result<Vec<TimeSlot>>;

    /// Persisted occupied intervals for one engineer/day, already resolved
    /// to each chunk's effective DC. Limited to the statuses that hold a
    /// calendar day (`planned`, `assigned`, `in_progress`).
    async fn occupied_intervals(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<OccupiedInterval>>;

    /// Sum of `end - start` over TimeSlots in `[start, end]`.
    async fn capacity_hours(
        &self,
        engineer_id: EngineerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<u32>;

    /// Sum of persisted chunk durations occupying the engineer's calendar in
    /// `[start, end]`.
    async fn used_hours(
        &self,
        engineer_id: EngineerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<u32>;

    /// The DC of a chunk persisted-assigned to this engineer on this day,
    /// if any. Deliberately narrower than `occupied_intervals`: it reports
    /// only the chunk's own `data_center_id`, with no fallback to the
    /// parent work's DC (see DESIGN.md for why this mirrors the source
    /// asymmetry rather than `effective_dc`).
    async fn engineer_dc_on_date(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Option<DataCenterId>>;
}

/// Planning context for a single call into the Planning Service. Not
/// `Clone`, not shared across calls: every call constructs its own instance
/// so the virtual overlay cannot leak between concurrent planners.
pub struct PlanningContext {
    data: Arc<dyn CalendarDataSource>,
    oracle: DistanceOracle,
    dc_regions: HashMap<DataCenterId, RegionId>,
    virtual_assignments: Vec<VirtualAssignment>,
    loaded: bool,
}

impl PlanningContext {
    pub fn new(data: Arc<dyn CalendarDataSource>) -> Self {
        Self {
            data,
            oracle: DistanceOracle::default(),
            dc_regions: HashMap::new(),
            virtual_assignments: Vec::new(),
            loaded: false,
        }
    }

    /// Loads the distance matrix and DC->region map once. Idempotent within
    /// one context; callers issue it at the start of every public Planning
    /// Service operation.
    pub async fn load_global_context(&mut self) -> anyhow::Result<()> {
        if self.loaded {
            return Ok(());
        }
        let entries = self.data.distance_entries().await?;
        self.oracle = DistanceOracle::new(entries);
        self.dc_regions = self.data.data_center_regions().await?;
        self.loaded = true;
        Ok(())
    }

    pub fn add_virtual_assignment(&mut self, assignment: VirtualAssignment) {
        self.virtual_assignments.push(assignment);
    }

    pub fn virtual_assignments(&self) -> &[VirtualAssignment] {
        &self.virtual_assignments
    }

    /// Candidate engineers, region-filtered by `dc_id` when given, with
    /// `preferred_engineer_id` stably moved to the front.
    pub async fn candidate_engineers(
        &mut self,
        dc_id: Option<DataCenterId>,
        preferred_engineer_id: Option<EngineerId>,
    ) -> anyhow::Result<Vec<Engineer>> {
        let region_id = match dc_id {
            Some(dc) => {
                self.load_global_context().await?;
                self.dc_regions.get(&dc).copied()
            }
            None => None,
        };

        let mut engineers = self.data.engineers(region_id).await?;

        if let Some(preferred) = preferred_engineer_id {
            engineers.sort_by_key(|e| if e.id == preferred { 0 } else { 1 });
        }

        Ok(engineers)
    }

    pub async fn engineer_slots(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<TimeSlot>> {
        self.data.engineer_slots(engineer_id, day).await
    }

    /// Persisted and virtual occupied intervals merged into one list and
    /// sorted together by start hour.
    pub async fn occupied_intervals(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<OccupiedInterval>> {
        let mut occupied = self.data.occupied_intervals(engineer_id, day).await?;

        for assignment in &self.virtual_assignments {
            if assignment.engineer_id == engineer_id && assignment.date == day {
                occupied.push(OccupiedInterval {
                    start: assignment.start_hour,
                    end: assignment.end_hour(),
                    dc_id: assignment.dc_id,
                });
            }
        }

        occupied.sort_by_key(|o| o.start);
        Ok(occupied)
    }

    /// `(used_hours, capacity_hours)` for `engineer_id` over `[start, end]`,
    /// counting both persisted and virtual assignments.
    pub async fn load(
        &self,
        engineer_id: EngineerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<(u32, u32)> {
        let capacity = self.data.capacity_hours(engineer_id, start, end).await?;
        let mut used = self.data.used_hours(engineer_id, start, end).await?;

        for assignment in &self.virtual_assignments {
            if assignment.engineer_id == engineer_id
                && assignment.date >= start
                && assignment.date <= end
            {
                used += assignment.duration_hours;
            }
        }

        Ok((used, capacity))
    }

    /// The region a DC belongs to, loading the global context on first use.
    pub async fn region_of(&mut self, dc_id: DataCenterId) -> anyhow::Result<Option<RegionId>> {
        self.load_global_context().await?;
        Ok(self.dc_regions.get(&dc_id).copied())
    }

    pub fn travel_hours(&self, from_dc: Option<DataCenterId>, to_dc: Option<DataCenterId>) -> Hour {
        self.oracle.travel_hours(from_dc, to_dc)
    }

    /// The DC an engineer is already committed to on `day`, checking the
    /// virtual overlay first and the persisted store second.
    pub async fn engineer_dc_on_date(
        &self,
        engineer_id: EngineerId,
        day: NaiveDate,
    ) -> anyhow::Result<Option<DataCenterId>> {
        for assignment in &self.virtual_assignments {
            if assignment.engineer_id == engineer_id && assignment.date == day {
                if let Some(dc) = assignment.dc_id {
                    return Ok(Some(dc));
                }
            }
        }

        self.data.engineer_dc_on_date(engineer_id, day).await
    }
}
