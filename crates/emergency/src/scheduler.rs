//! Tick scheduling
//!
//! The countdown never touches a clock directly. Production code uses
//! [`TokioScheduler`]; tests drive a [`ManualScheduler`] one period at a time.

use crate::ScheduleError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// Callback invoked once per period
pub type TickFn = Arc<dyn Fn() + Send + Sync>;

/// Source of periodic ticks
pub trait TickScheduler: Send + Sync {
    /// Invoke `tick` every `period`, first after one full period
    fn schedule_repeating(&self, period: Duration, tick: TickFn) -> Result<TickHandle, ScheduleError>;
}

/// Owner of an armed timer; stopping (or dropping) it disarms the timer
pub struct TickHandle {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl TickHandle {
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// Disarm the timer
    pub fn stop(mut self) {
        self.disarm();
    }

    fn disarm(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl std::fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickHandle")
            .field("armed", &self.stop.is_some())
            .finish()
    }
}

/// Wall-clock scheduler backed by a tokio interval task
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler {
    runtime: Option<Handle>,
}

impl TokioScheduler {
    /// Use whichever runtime is current when a timer is armed
    pub fn new() -> Self {
        Self { runtime: None }
    }

    /// Always spawn timers on `runtime`
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }
}

impl TickScheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, tick: TickFn) -> Result<TickHandle, ScheduleError> {
        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|e| ScheduleError::NoRuntime(e.to_string()))?,
        };

        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                tick();
            }
        });

        Ok(TickHandle::new(move || task.abort()))
    }
}

#[derive(Default)]
struct ManualTimers {
    next_id: u64,
    active: Vec<(u64, TickFn)>,
    refuse: Option<String>,
}

/// Virtual clock: ticks happen only when the test says so
#[derive(Clone, Default)]
pub struct ManualScheduler {
    timers: Arc<Mutex<ManualTimers>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `schedule_repeating` calls fail with `reason`
    pub fn refuse(&self, reason: impl Into<String>) {
        self.lock().refuse = Some(reason.into());
    }

    /// Number of armed timers
    pub fn active_timers(&self) -> usize {
        self.lock().active.len()
    }

    /// Fire every armed timer `periods` times
    ///
    /// Timers disarmed by a callback stop firing immediately.
    pub fn advance(&self, periods: u32) {
        for _ in 0..periods {
            let ids: Vec<u64> = self.lock().active.iter().map(|(id, _)| *id).collect();
            for id in ids {
                // Looked up per call so a timer stopped mid-period is skipped
                let tick = self
                    .lock()
                    .active
                    .iter()
                    .find(|(timer, _)| *timer == id)
                    .map(|(_, tick)| tick.clone());
                if let Some(tick) = tick {
                    tick();
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualTimers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule_repeating(&self, _period: Duration, tick: TickFn) -> Result<TickHandle, ScheduleError> {
        let mut timers = self.lock();
        if let Some(reason) = &timers.refuse {
            return Err(ScheduleError::Unavailable(reason.clone()));
        }

        let id = timers.next_id;
        timers.next_id += 1;
        timers.active.push((id, tick));
        debug!("Manual timer {} armed", id);

        let shared = self.timers.clone();
        Ok(TickHandle::new(move || {
            let mut timers = shared.lock().unwrap_or_else(PoisonError::into_inner);
            timers.active.retain(|(timer, _)| *timer != id);
        }))
    }
}
