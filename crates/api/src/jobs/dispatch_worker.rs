//! Dispatch Worker: drains MATCHING rides, matches against nearby
//! AVAILABLE drivers, and assigns the first candidate that accepts.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use domain::models::RideStatus;
use domain::services::EventPublisher;
use persistence::db::run_in_tx;
use persistence::entities::RideEntity;
use persistence::geo::DriverGeoIndex;
use persistence::repositories::ride::{self, RideRepository};
use sqlx::PgPool;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::assignment::AssignmentService;
use crate::services::matching::{self, MatchPolicy};

use super::scheduler::{Job, JobFrequency};

pub struct DispatchWorkerJob {
    pool: PgPool,
    rides: RideRepository,
    geo_index: Arc<DriverGeoIndex>,
    assignment: Arc<AssignmentService>,
    events: Arc<dyn EventPublisher>,
    match_policy: MatchPolicy,
    poll_interval_secs: u64,
    match_timeout_secs: i64,
    batch_size: i64,
    subbatch: usize,
    max_age_secs: i64,
}

impl DispatchWorkerJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        geo_index: Arc<DriverGeoIndex>,
        assignment: Arc<AssignmentService>,
        events: Arc<dyn EventPublisher>,
        match_policy: MatchPolicy,
        poll_interval_secs: u64,
        match_timeout_secs: i64,
        batch_size: i64,
        subbatch: usize,
        max_age_secs: i64,
    ) -> Self {
        let rides = RideRepository::new(pool.clone());
        Self {
            pool,
            rides,
            geo_index,
            assignment,
            events,
            match_policy,
            poll_interval_secs,
            match_timeout_secs,
            batch_size,
            subbatch: subbatch.max(1),
            max_age_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for DispatchWorkerJob {
    fn name(&self) -> &'static str {
        "dispatch_worker"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.poll_interval_secs)
    }

    /// One tick: poll a batch of MATCHING rides (step 1) and
    /// process up to `subbatch` of them concurrently via a bounded-width
    /// `JoinSet`, so one slow ride's candidate scan never starves the rest
    /// of the batch.
    async fn execute(&self) -> Result<(), String> {
        let max_age = ChronoDuration::seconds(self.max_age_secs);
        let batch = self
            .rides
            .poll_matching(max_age, self.batch_size)
            .await
            .map_err(|e| format!("poll_matching failed: {e}"))?;

        let scanned = batch.len();
        let matched = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut pending = batch.into_iter();
        let mut joinset: JoinSet<()> = JoinSet::new();

        loop {
            while joinset.len() < self.subbatch {
                let Some(ride_entity) = pending.next() else {
                    break;
                };
                let pool = self.pool.clone();
                let geo_index = self.geo_index.clone();
                let assignment = self.assignment.clone();
                let events = self.events.clone();
                let match_policy = self.match_policy;
                let match_timeout_secs = self.match_timeout_secs;
                let matched = matched.clone();
                joinset.spawn(async move {
                    match process_ride(
                        ride_entity,
                        pool,
                        geo_index,
                        assignment,
                        events,
                        match_policy,
                        match_timeout_secs,
                    )
                    .await
                    {
                        Ok(true) => {
                            matched.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        }
                        Ok(false) => {}
                        Err(err) => {
                            tracing::warn!(error = %err, "dispatch_worker: ride processing failed");
                        }
                    }
                });
            }

            if joinset.is_empty() {
                break;
            }
            joinset.join_next().await;
        }

        crate::middleware::record_dispatch_tick(scanned, matched.load(std::sync::atomic::Ordering::Relaxed));

        Ok(())
    }
}

/// Attempts every candidate in ranked order until one accepts assignment.
/// A `Conflict` (driver snatched by a concurrent assignment, or gone
/// AVAILABLE since the geo-index snapshot was taken) is a soft miss — the
/// next candidate is tried. A ride with no accepting candidate past
/// `match_timeout_secs` is expired (step 3).
async fn process_ride(
    ride_entity: RideEntity,
    pool: PgPool,
    geo_index: Arc<DriverGeoIndex>,
    assignment: Arc<AssignmentService>,
    events: Arc<dyn EventPublisher>,
    match_policy: MatchPolicy,
    match_timeout_secs: i64,
) -> Result<bool, ApiError> {
    let candidates = matching::find_nearby(
        &geo_index,
        ride_entity.pickup_lat,
        ride_entity.pickup_lon,
        Some(ride_entity.tier),
        match_policy,
    );

    for candidate in candidates {
        match assignment.assign(ride_entity.id, candidate.driver_id).await {
            Ok(()) => return Ok(true),
            Err(ApiError::Conflict(_)) | Err(ApiError::NotFound(_)) => continue,
            Err(other) => return Err(other),
        }
    }

    let age = Utc::now() - ride_entity.created_at;
    if age > ChronoDuration::seconds(match_timeout_secs) {
        expire_ride(&pool, ride_entity.id, &events).await?;
    }

    Ok(false)
}

/// Locks and re-reads the ride before expiring it — the `RideEntity` passed
/// in is only a `poll_matching` snapshot, possibly stale under the
/// multi-instance model (another instance may have assigned it in the
/// meantime). A ride no longer in MATCHING is left untouched rather than
/// clobbered.
async fn expire_ride(
    pool: &PgPool,
    ride_id: Uuid,
    events: &Arc<dyn EventPublisher>,
) -> Result<(), ApiError> {
    let expired = run_in_tx::<_, ApiError, _>(pool, move |tx| {
        Box::pin(async move {
            let current = ride::lock_for_update(tx, ride_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("ride {ride_id} not found")))?;

            if current.status != RideStatus::Matching {
                return Ok(false);
            }

            ride::validate_and_record_status(tx, &current, RideStatus::Expired).await?;
            Ok(true)
        })
    })
    .await?;

    if expired {
        events.publish(domain::models::DispatchEvent::RideUpdated {
            ride_id,
            status: RideStatus::Expired,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn job_frequency_matches_configured_poll_interval() {
        let freq = JobFrequency::Seconds(5);
        assert_eq!(freq.duration(), Duration::from_secs(5));
    }
}
