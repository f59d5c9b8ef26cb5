//! Vehicle & Location Telemetry
//!
//! Snapshot types for the two telemetry providers, simulated links for both,
//! and [`TelemetryAggregator`], the merge point that combines their latest
//! values with the crash/emergency flag.

mod aggregator;
mod links;
mod snapshot;

pub use aggregator::TelemetryAggregator;
pub use links::{SimulatedLocationLink, SimulatedVehicleLink};
pub use snapshot::{LocationSnapshot, TelemetrySnapshot, VehicleSnapshot};

use connection::SourceHandle;

/// Handle to a running vehicle-diagnostics source
pub type VehicleSource = SourceHandle<VehicleSnapshot>;

/// Handle to a running location source
pub type LocationSource = SourceHandle<LocationSnapshot>;
