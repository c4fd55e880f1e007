//! Location Writer (support job): drains the bounded location-update
//! channel and persists a coalesced last-write-wins batch per tick, so the
//! fast `update_location` path never blocks on a row write.

use std::collections::HashMap;

use persistence::repositories::driver::DriverRepository;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::services::driver_registry::LocationUpdate;

use super::scheduler::{Job, JobFrequency};

/// How many queued updates to drain per tick before yielding back to the
/// scheduler, bounding a single tick's work even under sustained load.
const MAX_DRAIN_PER_TICK: usize = 10_000;

pub struct LocationWriterJob {
    drivers: DriverRepository,
    rx: tokio::sync::Mutex<mpsc::Receiver<LocationUpdate>>,
    flush_interval_secs: u64,
}

impl LocationWriterJob {
    pub fn new(
        drivers: DriverRepository,
        rx: mpsc::Receiver<LocationUpdate>,
        flush_interval_secs: u64,
    ) -> Self {
        Self {
            drivers,
            rx: tokio::sync::Mutex::new(rx),
            flush_interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for LocationWriterJob {
    fn name(&self) -> &'static str {
        "location_writer"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.flush_interval_secs)
    }

    /// Drains whatever is queued, coalescing by `driver_id` so a driver with
    /// several updates in one window only costs a single row write (the last
    /// one wins).
    async fn execute(&self) -> Result<(), String> {
        let mut rx = self.rx.lock().await;
        let mut coalesced: HashMap<Uuid, (f64, f64)> = HashMap::new();

        let mut drained = 0usize;
        while drained < MAX_DRAIN_PER_TICK {
            match rx.try_recv() {
                Ok(update) => {
                    coalesced.insert(update.driver_id, (update.lat, update.lon));
                    drained += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            }
        }
        drop(rx);

        if coalesced.is_empty() {
            return Ok(());
        }

        let updates: Vec<(Uuid, f64, f64)> = coalesced
            .into_iter()
            .map(|(id, (lat, lon))| (id, lat, lon))
            .collect();

        self.drivers
            .update_locations_batch(&updates)
            .await
            .map_err(|e| format!("update_locations_batch failed: {e}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_drain_per_tick_is_positive() {
        assert!(MAX_DRAIN_PER_TICK > 0);
    }
}
