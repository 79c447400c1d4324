//! Distance Oracle (C2): directed travel-time lookup between data centers.

use std::collections::HashMap;

use crate::types::{DataCenterId, DistanceEntry, Hour};

/// In-memory travel-time table, loaded once per planning call and reused for
/// every lookup within that call (the matrix changes rarely and a planning
/// run needs a stable snapshot).
#[derive(Debug, Clone, Default)]
pub struct DistanceOracle {
    minutes: HashMap<(DataCenterId, DataCenterId), u32>,
}

impl DistanceOracle {
    pub fn new(entries: impl IntoIterator<Item = DistanceEntry>) -> Self {
        let minutes = entries
            .into_iter()
            .map(|e| ((e.from_dc, e.to_dc), e.duration_minutes))
            .collect();
        Self { minutes }
    }

    /// Travel time in whole hours, rounded up. Identical or unknown
    /// endpoints cost nothing; an unknown directed pair falls back to the
    /// reverse direction, then to a 60-minute default. The fallback never
    /// overwrites an asymmetric entry that *is* on file.
    pub fn travel_hours(&self, from_dc: Option<DataCenterId>, to_dc: Option<DataCenterId>) -> Hour {
        let (Some(from), Some(to)) = (from_dc, to_dc) else {
            return 0;
        };
        if from == to {
            return 0;
        }

        let minutes = self
            .minutes
            .get(&(from, to))
            .or_else(|| self.minutes.get(&(to, from)))
            .copied()
            .unwrap_or(60);

        minutes.div_ceil(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc(n: u8) -> DataCenterId {
        uuid::Uuid::from_u128(n as u128)
    }

    #[test]
    fn identical_endpoints_cost_nothing() {
        let oracle = DistanceOracle::default();
        assert_eq!(oracle.travel_hours(Some(dc(1)), Some(dc(1))), 0);
    }

    #[test]
    fn missing_endpoint_costs_nothing() {
        let oracle = DistanceOracle::default();
        assert_eq!(oracle.travel_hours(None, Some(dc(1))), 0);
        assert_eq!(oracle.travel_hours(Some(dc(1)), None), 0);
    }

    #[test]
    fn unknown_pair_defaults_to_sixty_minutes() {
        let oracle = DistanceOracle::default();
        assert_eq!(oracle.travel_hours(Some(dc(1)), Some(dc(2))), 1);
    }

    #[test]
    fn forward_entry_rounds_up() {
        let oracle = DistanceOracle::new([DistanceEntry {
            from_dc: dc(1),
            to_dc: dc(2),
            duration_minutes: 61,
        }]);
        assert_eq!(oracle.travel_hours(Some(dc(1)), Some(dc(2))), 2);
    }

    #[test]
    fn reverse_fallback_does_not_overwrite_asymmetric_entry() {
        let oracle = DistanceOracle::new([DistanceEntry {
            from_dc: dc(2),
            to_dc: dc(1),
            duration_minutes: 120,
        }]);
        // (1 -> 2) has no entry of its own, so it falls back to (2 -> 1).
        assert_eq!(oracle.travel_hours(Some(dc(1)), Some(dc(2))), 2);

        // Now both directions are on file and must stay independent.
        let oracle = DistanceOracle::new([
            DistanceEntry {
                from_dc: dc(1),
                to_dc: dc(2),
                duration_minutes: 30,
            },
            DistanceEntry {
                from_dc: dc(2),
                to_dc: dc(1),
                duration_minutes: 120,
            },
        ]);
        assert_eq!(oracle.travel_hours(Some(dc(1)), Some(dc(2))), 1);
        assert_eq!(oracle.travel_hours(Some(dc(2)), Some(dc(1))), 2);
    }
}
