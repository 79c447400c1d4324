//! Slot Search Engine (C6).
//!
//! For one `(engineer, chunk, date window)` this enumerates a first
//! feasible start hour per day, sweeping the engineer's occupied intervals
//! and accounting for travel time to and from each one. One suggestion per
//! day per engineer is enough for strategy ranking; enumerating every
//! feasible start would blow up combinatorics without changing the outcome.

use chrono::{Duration, NaiveDate};

use crate::context::PlanningContext;
use crate::types::{
    DataCenterId, Engineer, Hour, OccupiedInterval, SlotSuggestion, Work, WorkChunk, WorkType,
};

pub async fn find_available_slots(
    ctx: &PlanningContext,
    engineer: &Engineer,
    chunk: &WorkChunk,
    work: &Work,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> anyhow::Result<Vec<SlotSuggestion>> {
    let mut suggestions = Vec::new();
    let duration = chunk.duration_hours;
    if duration == 0 {
        anyhow::bail!("chunk {} has zero duration, cannot be scheduled", chunk.id);
    }
    let target_dc = chunk.effective_dc(work);

    let mut day = window_start;
    while day <= window_end {
        let work_slots = ctx.engineer_slots(engineer.id, day).await?;
        if work_slots.is_empty() {
            day += Duration::days(1);
            continue;
        }

        let occupied = ctx.occupied_intervals(engineer.id, day).await?;

        for slot in &work_slots {
            if work.work_type == WorkType::Support {
                if let Some(target_time) = work.target_time {
                    if target_time >= slot.start_hour
                        && target_time + duration <= slot.end_hour
                        && is_slot_free(ctx, target_time, duration, &occupied, target_dc)
                    {
                        suggestions.push(make_suggestion(
                            engineer, day, target_time, duration, target_dc, work.priority,
                        ));
                    }
                    continue;
                }
            }

            if let Some(start) =
                find_start_time_in_slot(ctx, slot.start_hour, slot.end_hour, duration, &occupied, target_dc)
            {
                suggestions.push(make_suggestion(engineer, day, start, duration, target_dc, work.priority));
                // One candidate per engineer per day is enough for ranking.
                break;
            }
        }

        day += Duration::days(1);
    }

    Ok(suggestions)
}

fn is_slot_free(
    ctx: &PlanningContext,
    start: Hour,
    duration: Hour,
    occupied: &[OccupiedInterval],
    target_dc: Option<DataCenterId>,
) -> bool {
    find_start_time_in_slot(ctx, start, start + duration, duration, occupied, target_dc).is_some()
}

/// Single sweep over `occupied` (already sorted by start) within
/// `[slot_start, slot_end)`, honoring travel time to/from each neighboring
/// interval.
fn find_start_time_in_slot(
    ctx: &PlanningContext,
    slot_start: Hour,
    slot_end: Hour,
    duration: Hour,
    occupied: &[OccupiedInterval],
    target_dc: Option<DataCenterId>,
) -> Option<Hour> {
    if occupied.is_empty() {
        return (slot_start + duration <= slot_end).then_some(slot_start);
    }

    let mut cursor = slot_start;
    let mut prev: Option<&OccupiedInterval> = None;

    for occ in occupied {
        if occ.end <= slot_start {
            prev = Some(occ);
            continue;
        }
        if occ.start >= slot_end {
            break;
        }

        let mut potential = cursor.max(slot_start);
        if let Some(p) = prev {
            let travel_in = ctx.travel_hours(p.dc_id, target_dc);
            potential = potential.max(p.end + travel_in);
        }

        let travel_out = ctx.travel_hours(target_dc, occ.dc_id);
        if potential + duration + travel_out <= occ.start
            && potential >= slot_start
            && potential + duration <= slot_end
        {
            return Some(potential);
        }

        cursor = cursor.max(occ.end);
        prev = Some(occ);
    }

    let mut potential = cursor.max(slot_start);
    if let Some(p) = prev {
        let travel_in = ctx.travel_hours(p.dc_id, target_dc);
        potential = potential.max(p.end + travel_in);
    }

    (potential + duration <= slot_end).then_some(potential)
}

fn make_suggestion(
    engineer: &Engineer,
    date: NaiveDate,
    start: Hour,
    duration: Hour,
    dc_id: Option<DataCenterId>,
    priority: crate::types::Priority,
) -> SlotSuggestion {
    SlotSuggestion {
        engineer_id: engineer.id,
        engineer_name: engineer.name.clone(),
        date,
        start_hour: start,
        end_hour: start + duration,
        duration_hours: duration,
        dc_id,
        priority,
    }
}
