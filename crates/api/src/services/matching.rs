//! Matching Service: ranked nearby AVAILABLE drivers for a pickup point.
//!
//! A thin, allocation-light wrapper over [`persistence::geo::DriverGeoIndex`] —
//! a single call into the geospatial index, no store reads in the hot path.

use domain::models::{CandidateDriver, RideTier};
use persistence::geo::DriverGeoIndex;

/// Matching policy: search radius and result cap.
#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    pub radius_km: f64,
    pub limit: usize,
}

/// Returns nearby AVAILABLE drivers ordered by ascending distance.
///
/// `tier` is accepted as a future capability-filtering hook; the default
/// implementation ignores it.
pub fn find_nearby(
    geo_index: &DriverGeoIndex,
    pickup_lat: f64,
    pickup_lon: f64,
    _tier: Option<RideTier>,
    policy: MatchPolicy,
) -> Vec<CandidateDriver> {
    geo_index
        .search_nearby(pickup_lon, pickup_lat, policy.radius_km, policy.limit)
        .into_iter()
        .map(|nearby| CandidateDriver {
            driver_id: nearby.driver_id,
            distance_km: nearby.distance_km,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_index_returns_no_candidates() {
        let index = DriverGeoIndex::new(Duration::from_secs(60));
        let candidates = find_nearby(
            &index,
            37.7749,
            -122.4194,
            None,
            MatchPolicy {
                radius_km: 5.0,
                limit: 5,
            },
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn finds_an_upserted_driver_within_radius() {
        let index = DriverGeoIndex::new(Duration::from_secs(60));
        let driver_id = uuid::Uuid::new_v4();
        index.upsert(driver_id, -122.4194, 37.7749);

        let candidates = find_nearby(
            &index,
            37.7749,
            -122.4194,
            None,
            MatchPolicy {
                radius_km: 5.0,
                limit: 5,
            },
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].driver_id, driver_id);
    }

    #[test]
    fn result_respects_configured_limit() {
        let index = DriverGeoIndex::new(Duration::from_secs(60));
        for _ in 0..10 {
            index.upsert(uuid::Uuid::new_v4(), -122.4194, 37.7749);
        }
        let candidates = find_nearby(
            &index,
            37.7749,
            -122.4194,
            None,
            MatchPolicy {
                radius_km: 5.0,
                limit: 3,
            },
        );
        assert_eq!(candidates.len(), 3);
    }
}
