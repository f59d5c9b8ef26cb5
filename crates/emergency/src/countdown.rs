//! Emergency countdown state machine
//!
//! ```text
//! Idle --start--> Counting(max) --tick*--> Triggered
//!                      |
//!                      +--cancel--> Cancelled
//! ```
//!
//! Terminal phases go back to `Idle` via `reset`, or straight into a new
//! episode via `start`.

use crate::{
    AlertDispatcher, CountdownError, EmergencyAlert, TickFn, TickHandle, TickScheduler,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use telemetry::TelemetryAggregator;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Capacity of the countdown event channel
const EVENT_CAPACITY: usize = 64;

/// Countdown configuration
#[derive(Debug, Clone)]
pub struct CountdownConfig {
    /// Number of ticks before the alert fires (default: 10)
    pub max_duration: u32,
    /// Time between ticks (default: 1s)
    pub tick_period: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            max_duration: 10,
            tick_period: Duration::from_secs(1),
        }
    }
}

/// Phase of the current escalation episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EmergencyPhase {
    #[default]
    Idle,
    Counting {
        remaining: u32,
    },
    Cancelled,
    Triggered,
}

impl EmergencyPhase {
    pub fn is_counting(&self) -> bool {
        matches!(self, EmergencyPhase::Counting { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EmergencyPhase::Cancelled | EmergencyPhase::Triggered)
    }
}

/// Observable countdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmergencyState {
    pub phase: EmergencyPhase,
    pub max_duration: u32,
}

/// Notifications for presentation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CountdownEvent {
    Started { episode_id: Uuid, max_duration: u32 },
    Tick { remaining: u32 },
    Triggered { episode_id: Uuid },
    Cancelled { episode_id: Uuid },
}

struct Episode {
    phase: EmergencyPhase,
    /// Incremented on every start; ticks carry the value they were armed with
    generation: u64,
    id: Uuid,
    timer: Option<TickHandle>,
}

struct Shared {
    config: CountdownConfig,
    episode: Mutex<Episode>,
    scheduler: Arc<dyn TickScheduler>,
    dispatcher: Arc<dyn AlertDispatcher>,
    telemetry: TelemetryAggregator,
    events: broadcast::Sender<CountdownEvent>,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, Episode>, CountdownError> {
        self.episode
            .lock()
            .map_err(|e| CountdownError::Lock(e.to_string()))
    }

    fn emit(&self, event: CountdownEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Advance the countdown by one tick
    ///
    /// With `generation` set, the tick only applies to that episode.
    fn tick(&self, generation: Option<u64>) -> Result<EmergencyPhase, CountdownError> {
        let alert = {
            let mut episode = self.lock()?;
            if generation.is_some_and(|g| g != episode.generation) {
                debug!("Ignoring tick from a finished episode");
                return Ok(episode.phase);
            }
            let EmergencyPhase::Counting { remaining } = episode.phase else {
                return Ok(episode.phase);
            };

            let remaining = remaining.saturating_sub(1);
            self.emit(CountdownEvent::Tick { remaining });

            if remaining > 0 {
                debug!("Emergency countdown: {}s remaining", remaining);
                episode.phase = EmergencyPhase::Counting { remaining };
                return Ok(episode.phase);
            }

            episode.phase = EmergencyPhase::Triggered;
            if let Some(timer) = episode.timer.take() {
                timer.stop();
            }
            self.emit(CountdownEvent::Triggered {
                episode_id: episode.id,
            });
            error!("Emergency countdown expired (episode {})", episode.id);

            EmergencyAlert {
                episode_id: episode.id,
                triggered_at: Utc::now(),
                snapshot: self.telemetry.snapshot(),
            }
        };

        if let Err(e) = self.dispatcher.dispatch(&alert) {
            warn!("Emergency alert dispatch failed: {}", e);
        }
        Ok(EmergencyPhase::Triggered)
    }
}

/// Cancellable escalation countdown
///
/// Cheap to clone; clones share one episode.
#[derive(Clone)]
pub struct EmergencyCountdown {
    shared: Arc<Shared>,
}

impl EmergencyCountdown {
    pub fn new(
        config: CountdownConfig,
        scheduler: Arc<dyn TickScheduler>,
        dispatcher: Arc<dyn AlertDispatcher>,
        telemetry: TelemetryAggregator,
    ) -> Result<Self, CountdownError> {
        if config.max_duration == 0 {
            return Err(CountdownError::InvalidDuration);
        }
        info!(
            "Creating emergency countdown: {} ticks of {:?}",
            config.max_duration, config.tick_period
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                episode: Mutex::new(Episode {
                    phase: EmergencyPhase::Idle,
                    generation: 0,
                    id: Uuid::nil(),
                    timer: None,
                }),
                scheduler,
                dispatcher,
                telemetry,
                events,
            }),
        })
    }

    /// Begin a new episode
    ///
    /// Returns `Ok(false)` without touching the clock when an episode is
    /// already counting. If the tick cannot be armed the phase is left
    /// unchanged and the error is returned.
    pub fn start(&self) -> Result<bool, CountdownError> {
        let mut episode = self.shared.lock()?;
        if let EmergencyPhase::Counting { remaining } = episode.phase {
            debug!("Countdown already running ({}s left), ignoring start", remaining);
            return Ok(false);
        }

        let generation = episode.generation + 1;
        let weak = Arc::downgrade(&self.shared);
        let tick: TickFn = Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                if let Err(e) = shared.tick(Some(generation)) {
                    error!("Countdown tick failed: {}", e);
                }
            }
        });

        let timer = self
            .shared
            .scheduler
            .schedule_repeating(self.shared.config.tick_period, tick)
            .map_err(|e| {
                error!("Cannot arm emergency countdown: {}", e);
                CountdownError::Schedule(e)
            })?;

        let max_duration = self.shared.config.max_duration;
        episode.generation = generation;
        episode.id = Uuid::new_v4();
        episode.phase = EmergencyPhase::Counting {
            remaining: max_duration,
        };
        episode.timer = Some(timer);

        warn!(
            "Emergency countdown started: {}s to cancel (episode {})",
            max_duration, episode.id
        );
        self.shared.emit(CountdownEvent::Started {
            episode_id: episode.id,
            max_duration,
        });
        Ok(true)
    }

    /// Advance the running episode by one tick; a no-op outside `Counting`
    pub fn tick(&self) -> Result<EmergencyPhase, CountdownError> {
        self.shared.tick(None)
    }

    /// Abort the running episode
    ///
    /// The tick schedule is disarmed before the phase flips, and both happen
    /// under the state lock, so no tick is applied once this returns.
    /// Returns `Ok(false)` outside `Counting`.
    pub fn cancel(&self) -> Result<bool, CountdownError> {
        let mut episode = self.shared.lock()?;
        if !episode.phase.is_counting() {
            debug!("No countdown running, ignoring cancel");
            return Ok(false);
        }

        if let Some(timer) = episode.timer.take() {
            timer.stop();
        }
        episode.phase = EmergencyPhase::Cancelled;

        info!("Emergency countdown cancelled by user (episode {})", episode.id);
        self.shared.emit(CountdownEvent::Cancelled {
            episode_id: episode.id,
        });
        Ok(true)
    }

    /// Return a terminal episode to `Idle`
    pub fn reset(&self) -> Result<bool, CountdownError> {
        let mut episode = self.shared.lock()?;
        if !episode.phase.is_terminal() {
            return Ok(false);
        }
        debug!("Emergency countdown reset from {:?}", episode.phase);
        episode.phase = EmergencyPhase::Idle;
        Ok(true)
    }

    pub fn state(&self) -> Result<EmergencyState, CountdownError> {
        Ok(EmergencyState {
            phase: self.shared.lock()?.phase,
            max_duration: self.shared.config.max_duration,
        })
    }

    pub fn phase(&self) -> Result<EmergencyPhase, CountdownError> {
        Ok(self.shared.lock()?.phase)
    }

    /// Subscribe to countdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<CountdownEvent> {
        self.shared.events.subscribe()
    }

    pub fn max_duration(&self) -> u32 {
        self.shared.config.max_duration
    }
}
