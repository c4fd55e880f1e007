//! In-process geospatial driver index.
//!
//! An `h3o`-based hexagonal grid index plus an LRU-cached Haversine distance
//! helper. `h3o` is a pure-Rust port of Uber's H3 library.
//!
//! Drivers are bucketed by H3 cell at resolution 8 (~460m edge length, tuned for
//! urban dispatch radii of a few km). `search_nearby` walks expanding `grid_disk`
//! rings from the pickup cell until the candidate count covers `limit` or the ring
//! radius exceeds `radius_km`, then Haversine-sorts and truncates.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use h3o::{CellIndex, LatLng, Resolution};
use lru::LruCache;
use uuid::Uuid;

/// H3 resolution used for bucketing drivers (~460m edge length at res 8).
const DRIVER_INDEX_RESOLUTION: Resolution = Resolution::Eight;

/// One entry in the index: a driver's last-known cell and upsert time, used
/// for the soft 60s freshness check (`geo.freshness`).
#[derive(Debug, Clone, Copy)]
struct DriverLocation {
    cell: CellIndex,
    lat: f64,
    lon: f64,
    last_seen: Instant,
}

/// Result of a `search_nearby` query: a driver id and its distance from the query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyDriver {
    pub driver_id: Uuid,
    pub distance_km: f64,
}

/// The geospatial driver index. Owned by `AppState` as a runtime singleton,
/// alongside the `PgPool` and the rate limiter state.
pub struct DriverGeoIndex {
    resolution: Resolution,
    freshness: Duration,
    by_driver: RwLock<HashMap<Uuid, DriverLocation>>,
    by_cell: RwLock<HashMap<CellIndex, Vec<Uuid>>>,
    distance_cache: Mutex<LruCache<(CellIndex, CellIndex), f64>>,
}

impl DriverGeoIndex {
    pub fn new(freshness: Duration) -> Self {
        Self {
            resolution: DRIVER_INDEX_RESOLUTION,
            freshness,
            by_driver: RwLock::new(HashMap::new()),
            by_cell: RwLock::new(HashMap::new()),
            distance_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(10_000).expect("cache size must be non-zero"),
            )),
        }
    }

    /// Upserts a driver's position, stamping its freshness (`update_location`/`create`).
    pub fn upsert(&self, driver_id: Uuid, lon: f64, lat: f64) {
        let Ok(latlng) = LatLng::new(lat, lon) else {
            return;
        };
        let cell = latlng.to_cell(self.resolution);

        let previous_cell = {
            let mut by_driver = self.by_driver.write().unwrap();
            let previous = by_driver.insert(
                driver_id,
                DriverLocation {
                    cell,
                    lat,
                    lon,
                    last_seen: Instant::now(),
                },
            );
            previous.map(|p| p.cell)
        };

        let mut by_cell = self.by_cell.write().unwrap();
        if let Some(previous_cell) = previous_cell {
            if previous_cell != cell {
                if let Some(members) = by_cell.get_mut(&previous_cell) {
                    members.retain(|id| *id != driver_id);
                }
            }
        }
        by_cell.entry(cell).or_default().push(driver_id);
    }

    /// Removes a driver from the index (`update_status` on non-AVAILABLE).
    pub fn remove(&self, driver_id: Uuid) {
        let removed_cell = {
            let mut by_driver = self.by_driver.write().unwrap();
            by_driver.remove(&driver_id).map(|loc| loc.cell)
        };
        if let Some(cell) = removed_cell {
            let mut by_cell = self.by_cell.write().unwrap();
            if let Some(members) = by_cell.get_mut(&cell) {
                members.retain(|id| *id != driver_id);
            }
        }
    }

    /// Returns up to `limit` drivers within `radius_km` of `(lon, lat)`, ascending
    /// distance. Entries older than `geo.freshness` are filtered as a second line
    /// of defense against a missed sweep on status transition.
    pub fn search_nearby(&self, lon: f64, lat: f64, radius_km: f64, limit: usize) -> Vec<NearbyDriver> {
        let Ok(origin_latlng) = LatLng::new(lat, lon) else {
            return Vec::new();
        };
        let origin_cell = origin_latlng.to_cell(self.resolution);

        let edge_km = self.resolution.edge_length_km();
        let max_k = if edge_km > 0.0 {
            ((radius_km / edge_km).ceil() as u32 + 1).max(1)
        } else {
            1
        };

        let by_driver = self.by_driver.read().unwrap();
        let by_cell = self.by_cell.read().unwrap();
        let now = Instant::now();

        let mut seen = std::collections::HashSet::new();
        let mut candidates: Vec<NearbyDriver> = Vec::new();
        let mut k = 0u32;

        loop {
            let ring = origin_cell.grid_disk::<Vec<_>>(k);
            let mut found_new = false;
            for cell in &ring {
                let Some(members) = by_cell.get(cell) else {
                    continue;
                };
                for driver_id in members {
                    if !seen.insert(*driver_id) {
                        continue;
                    }
                    let Some(location) = by_driver.get(driver_id) else {
                        continue;
                    };
                    if now.duration_since(location.last_seen) > self.freshness {
                        continue;
                    }
                    // Cheap cell-centroid pre-filter before the exact point-to-point
                    // Haversine: a driver can be at most ~edge_km from its cell's
                    // center, so only reject here when even that best case clears
                    // the radius. Repeat queries against popular pickup cells reuse
                    // this via the LRU cache instead of recomputing the centroid pair.
                    let cell_distance = self.distance_km_between_cells(origin_cell, location.cell);
                    if cell_distance > radius_km + edge_km {
                        continue;
                    }
                    let distance_km =
                        self.haversine_km((origin_latlng.lat(), origin_latlng.lng()), (location.lat, location.lon));
                    if distance_km <= radius_km {
                        candidates.push(NearbyDriver {
                            driver_id: *driver_id,
                            distance_km,
                        });
                        found_new = true;
                    }
                }
            }

            if candidates.len() >= limit || k >= max_k {
                break;
            }
            if k > 0 && !found_new && k >= 2 {
                // two consecutive empty rings beyond the first: nothing further to find
                break;
            }
            k += 1;
        }

        candidates.sort_by(|a, b| a.distance_km.partial_cmp(&b.distance_km).unwrap());
        candidates.truncate(limit);
        candidates
    }

    /// Returns the current number of tracked drivers (diagnostics/metrics).
    pub fn len(&self) -> usize {
        self.by_driver.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn haversine_km(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
        let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let sin_dlat = (dlat * 0.5).sin();
        let sin_dlon = (dlon * 0.5).sin();
        let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
        let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
        6371.0 * c
    }

    /// Cached cell-to-cell centroid distance, used by `search_nearby` as a cheap
    /// pre-filter before the exact point-to-point Haversine against a driver's
    /// actual coordinate. Keyed on the unordered cell pair so repeat queries
    /// against the same pickup/driver cells hit the cache.
    fn distance_km_between_cells(&self, a: CellIndex, b: CellIndex) -> f64 {
        let key = if a < b { (a, b) } else { (b, a) };
        let mut cache = self.distance_cache.lock().unwrap();
        *cache.get_or_insert(key, || {
            let a: LatLng = a.into();
            let b: LatLng = b.into();
            self.haversine_km((a.lat(), a.lng()), (b.lat(), b.lng()))
        })
    }
}

impl Default for DriverGeoIndex {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_search_finds_the_driver() {
        let index = DriverGeoIndex::new(Duration::from_secs(60));
        let driver_id = Uuid::new_v4();
        index.upsert(driver_id, -122.4194, 37.7749);

        let results = index.search_nearby(-122.4194, 37.7749, 5.0, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].driver_id, driver_id);
        assert!(results[0].distance_km < 0.01);
    }

    #[test]
    fn remove_drops_the_driver_from_subsequent_searches() {
        let index = DriverGeoIndex::new(Duration::from_secs(60));
        let driver_id = Uuid::new_v4();
        index.upsert(driver_id, -122.4194, 37.7749);
        index.remove(driver_id);

        let results = index.search_nearby(-122.4194, 37.7749, 5.0, 5);
        assert!(results.is_empty());
    }

    #[test]
    fn search_respects_limit_and_ascending_distance() {
        let index = DriverGeoIndex::new(Duration::from_secs(60));
        // Three drivers at increasing distance east of the query point.
        let near = Uuid::new_v4();
        let mid = Uuid::new_v4();
        let far = Uuid::new_v4();
        index.upsert(near, -122.4194, 37.7749);
        index.upsert(mid, -122.40, 37.7749);
        index.upsert(far, -122.35, 37.7749);

        let results = index.search_nearby(-122.4194, 37.7749, 10.0, 2);
        assert_eq!(results.len(), 2);
        assert!(results[0].distance_km <= results[1].distance_km);
        assert_eq!(results[0].driver_id, near);
    }

    #[test]
    fn stale_entries_are_filtered_by_freshness() {
        let index = DriverGeoIndex::new(Duration::from_millis(0));
        let driver_id = Uuid::new_v4();
        index.upsert(driver_id, -122.4194, 37.7749);
        std::thread::sleep(Duration::from_millis(5));

        let results = index.search_nearby(-122.4194, 37.7749, 5.0, 5);
        assert!(results.is_empty());
    }

    #[test]
    fn empty_index_returns_no_candidates() {
        let index = DriverGeoIndex::new(Duration::from_secs(60));
        let results = index.search_nearby(0.0, 0.0, 5.0, 5);
        assert!(results.is_empty());
    }
}
