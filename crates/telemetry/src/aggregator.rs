//! Combine-latest telemetry aggregator

use crate::{LocationSnapshot, TelemetrySnapshot, VehicleSnapshot};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Merge point for vehicle, location, and emergency updates
///
/// Each update replaces exactly one field in a single `send_modify`, so a
/// reader never observes a half-applied update. Clones share the same
/// snapshot.
#[derive(Clone)]
pub struct TelemetryAggregator {
    snapshot: Arc<watch::Sender<TelemetrySnapshot>>,
}

impl TelemetryAggregator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(TelemetrySnapshot::default());
        Self {
            snapshot: Arc::new(tx),
        }
    }

    /// Copy of the current merged snapshot
    pub fn snapshot(&self) -> TelemetrySnapshot {
        *self.snapshot.borrow()
    }

    /// Read-only change stream of the merged snapshot
    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.snapshot.subscribe()
    }

    pub fn update_vehicle(&self, vehicle: VehicleSnapshot) {
        self.snapshot.send_modify(|s| s.vehicle = vehicle);
    }

    pub fn update_location(&self, location: LocationSnapshot) {
        self.snapshot.send_modify(|s| s.location = location);
    }

    pub fn set_emergency_active(&self, active: bool) {
        debug!("Emergency active: {}", active);
        self.snapshot.send_modify(|s| s.emergency_active = active);
    }

    /// Forward a vehicle source's readings into the snapshot
    pub fn follow_vehicle(&self, readings: watch::Receiver<Option<VehicleSnapshot>>) -> JoinHandle<()> {
        info!("Aggregator following vehicle telemetry");
        self.follow(readings, Self::update_vehicle)
    }

    /// Forward a location source's readings into the snapshot
    pub fn follow_location(&self, readings: watch::Receiver<Option<LocationSnapshot>>) -> JoinHandle<()> {
        info!("Aggregator following location telemetry");
        self.follow(readings, Self::update_location)
    }

    fn follow<T>(&self, mut readings: watch::Receiver<Option<T>>, apply: fn(&Self, T)) -> JoinHandle<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        let aggregator = self.clone();
        tokio::spawn(async move {
            loop {
                let latest = *readings.borrow_and_update();
                if let Some(value) = latest {
                    apply(&aggregator, value);
                }
                if readings.changed().await.is_err() {
                    debug!("Telemetry source closed, aggregator keeps last value");
                    break;
                }
            }
        })
    }
}

impl Default for TelemetryAggregator {
    fn default() -> Self {
        Self::new()
    }
}
