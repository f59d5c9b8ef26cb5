//! Safety monitor loop
//!
//! One task owns the detector, the countdown and both telemetry sources.
//! Motion samples, countdown events and commands from the presentation
//! layer are serialized through a single `select!` loop; observers get
//! [`SafetyEvent`]s on a broadcast bus and telemetry through a watch channel.

use crate::{MonitorConfig, MonitorError, SafetyEvent, Services, TelemetrySourceKind};
use connection::{spawn_source, ConnectionError, ConnectionState, SourceConfig, SourceHandle};
use crash_detection::CrashDetector;
use emergency::{CountdownConfig, CountdownError, CountdownEvent, EmergencyCountdown, EmergencyState};
use motion::{CrashTrigger, MotionSample, MotionSource, MotionStream};
use telemetry::{LocationSource, TelemetryAggregator, TelemetrySnapshot, VehicleSource};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 256;
const COMMAND_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy)]
enum SourceAction {
    Connect,
    Disconnect,
    Retry,
}

#[derive(Debug)]
enum Command {
    CancelEmergency(oneshot::Sender<Result<bool, CountdownError>>),
    ResetEmergency(oneshot::Sender<Result<bool, CountdownError>>),
    Source {
        kind: TelemetrySourceKind,
        action: SourceAction,
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    },
    Shutdown,
}

/// Assembled but not yet running monitor
pub struct SafetyMonitor {
    config: MonitorConfig,
    services: Services,
    events: broadcast::Sender<SafetyEvent>,
}

impl SafetyMonitor {
    pub fn new(config: MonitorConfig, services: Services) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            services,
            events,
        }
    }

    /// Subscribe before `start` to observe startup notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SafetyEvent> {
        self.events.subscribe()
    }

    /// Start motion sampling, connect both telemetry sources and spawn the
    /// monitor loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<MonitorHandle, MonitorError> {
        let Self {
            config,
            services,
            events,
        } = self;
        let Services {
            mut motion,
            detector,
            vehicle,
            location,
            scheduler,
            dispatcher,
            crash_trigger,
        } = services;

        info!(
            "Starting safety monitor ({} detector, {}s countdown)",
            detector.name(),
            config.emergency.countdown_seconds
        );

        let aggregator = TelemetryAggregator::new();
        let countdown = EmergencyCountdown::new(
            CountdownConfig {
                max_duration: config.emergency.countdown_seconds,
                ..Default::default()
            },
            scheduler,
            dispatcher,
            aggregator.clone(),
        )?;
        let countdown_events = countdown.subscribe();

        let stream = motion.start()?;

        let telemetry = &config.telemetry;
        let vehicle: VehicleSource = spawn_source(
            TelemetrySourceKind::Vehicle.as_str(),
            vehicle,
            SourceConfig {
                scan_delay: telemetry.scan_delay(),
                poll_interval: telemetry.vehicle_interval(),
            },
        );
        let location: LocationSource = spawn_source(
            TelemetrySourceKind::Location.as_str(),
            location,
            SourceConfig {
                scan_delay: telemetry.scan_delay(),
                poll_interval: telemetry.location_interval(),
            },
        );

        let background = vec![
            aggregator.follow_vehicle(vehicle.readings()),
            aggregator.follow_location(location.readings()),
            forward_states(TelemetrySourceKind::Vehicle, &vehicle, events.clone())?,
            forward_states(TelemetrySourceKind::Location, &location, events.clone())?,
        ];

        vehicle.connect()?;
        location.connect()?;

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let worker = MonitorLoop {
            detector,
            countdown: countdown.clone(),
            aggregator: aggregator.clone(),
            events: events.clone(),
            vehicle,
            location,
            motion,
            background,
        };
        let task = tokio::spawn(worker.run(stream, commands_rx, countdown_events));

        Ok(MonitorHandle {
            commands: commands_tx,
            events,
            aggregator,
            countdown,
            crash_trigger,
            task,
        })
    }
}

fn forward_states<R: Clone + Send + Sync + 'static>(
    kind: TelemetrySourceKind,
    source: &SourceHandle<R>,
    events: broadcast::Sender<SafetyEvent>,
) -> Result<JoinHandle<()>, MonitorError> {
    let mut states = source.subscribe_state()?;
    Ok(tokio::spawn(async move {
        while let Some(state) = states.recv().await {
            let _ = events.send(SafetyEvent::ConnectionStateChanged {
                source: kind,
                state,
            });
        }
    }))
}

struct MonitorLoop {
    detector: Box<dyn CrashDetector>,
    countdown: EmergencyCountdown,
    aggregator: TelemetryAggregator,
    events: broadcast::Sender<SafetyEvent>,
    vehicle: VehicleSource,
    location: LocationSource,
    motion: Box<dyn MotionSource>,
    background: Vec<JoinHandle<()>>,
}

impl MonitorLoop {
    async fn run(
        self,
        mut stream: MotionStream,
        mut commands: mpsc::Receiver<Command>,
        mut countdown_events: broadcast::Receiver<CountdownEvent>,
    ) {
        let mut motion_live = true;

        loop {
            tokio::select! {
                sample = stream.next(), if motion_live => match sample {
                    Some(sample) => self.on_sample(&sample),
                    None => {
                        warn!("Motion stream ended, crash detection stopped");
                        motion_live = false;
                    }
                },
                event = countdown_events.recv() => match event {
                    Ok(event) => self.on_countdown_event(event),
                    Err(RecvError::Lagged(missed)) => warn!("Missed {} countdown events", missed),
                    Err(RecvError::Closed) => break,
                },
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.on_command(command) {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.stop().await;
    }

    fn on_sample(&self, sample: &MotionSample) {
        if !self.detector.evaluate(sample) {
            return;
        }

        metrics::counter!("crash_detections_total").increment(1);
        warn!(
            "Crash detected by {} detector: {:.2} g, {:.2} rad/s",
            self.detector.name(),
            sample.g_force(),
            sample.rotation_rate()
        );
        self.publish(SafetyEvent::CrashDetected {
            timestamp_ns: sample.timestamp_ns(),
            g_force: sample.g_force(),
            rotation_rate: sample.rotation_rate(),
        });
        match self.countdown.start() {
            Ok(true) => self.aggregator.set_emergency_active(true),
            Ok(false) => debug!("Countdown already running"),
            Err(e) => {
                error!("Emergency escalation unavailable: {}", e);
                self.publish(SafetyEvent::EscalationFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn on_countdown_event(&self, event: CountdownEvent) {
        match event {
            CountdownEvent::Started { max_duration, .. } => {
                self.publish(SafetyEvent::CountdownStarted {
                    remaining: max_duration,
                });
            }
            CountdownEvent::Tick { remaining } => {
                self.publish(SafetyEvent::CountdownTick { remaining });
            }
            CountdownEvent::Triggered { .. } => {
                metrics::counter!("emergencies_triggered_total").increment(1);
                self.publish(SafetyEvent::EmergencyTriggered);
            }
            CountdownEvent::Cancelled { .. } => self.emergency_cancelled(),
        }
    }

    fn emergency_cancelled(&self) {
        metrics::counter!("emergencies_cancelled_total").increment(1);
        self.publish(SafetyEvent::EmergencyCancelled);
    }

    /// Returns false when the loop should exit
    fn on_command(&self, command: Command) -> bool {
        match command {
            Command::CancelEmergency(reply) => {
                let result = self.countdown.cancel();
                if matches!(result, Ok(true)) {
                    self.aggregator.set_emergency_active(false);
                }
                let _ = reply.send(result);
            }
            Command::ResetEmergency(reply) => {
                let result = self.countdown.reset();
                if matches!(result, Ok(true)) {
                    self.aggregator.set_emergency_active(false);
                }
                let _ = reply.send(result);
            }
            Command::Source {
                kind,
                action,
                reply,
            } => {
                let result = match kind {
                    TelemetrySourceKind::Vehicle => apply_source_action(&self.vehicle, action),
                    TelemetrySourceKind::Location => apply_source_action(&self.location, action),
                };
                let _ = reply.send(result);
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn publish(&self, event: SafetyEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn stop(mut self) {
        info!("Stopping safety monitor");
        self.motion.stop();

        match self.countdown.cancel() {
            Ok(true) => self.emergency_cancelled(),
            Ok(false) => {}
            Err(e) => error!("Failed to disarm countdown on shutdown: {}", e),
        }

        self.vehicle.shutdown().await;
        self.location.shutdown().await;
        for task in self.background {
            task.abort();
        }
        info!("Safety monitor stopped");
    }
}

fn apply_source_action<R: Clone + Send + Sync + 'static>(
    source: &SourceHandle<R>,
    action: SourceAction,
) -> Result<(), ConnectionError> {
    debug!("{:?} requested for source {}", action, source.name());
    match action {
        SourceAction::Connect => source.connect(),
        SourceAction::Disconnect => source.disconnect(),
        SourceAction::Retry => source.retry(),
    }
}

/// Control surface for a running monitor
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SafetyEvent>,
    aggregator: TelemetryAggregator,
    countdown: EmergencyCountdown,
    crash_trigger: Option<CrashTrigger>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SafetyEvent> {
        self.events.subscribe()
    }

    /// Latest telemetry
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.aggregator.snapshot()
    }

    /// Telemetry updates; every change replaces the whole snapshot
    pub fn watch_telemetry(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.aggregator.subscribe()
    }

    pub fn emergency_state(&self) -> Result<EmergencyState, MonitorError> {
        Ok(self.countdown.state()?)
    }

    /// Crash injector, only available in simulation mode
    pub fn crash_trigger(&self) -> Option<CrashTrigger> {
        self.crash_trigger.clone()
    }

    /// Inject a crash into the synthetic motion source
    ///
    /// Returns false when the monitor runs on real hardware.
    pub fn simulate_crash(&self) -> bool {
        match &self.crash_trigger {
            Some(trigger) => {
                trigger.simulate_crash();
                true
            }
            None => {
                warn!("Crash simulation requested outside simulation mode");
                false
            }
        }
    }

    /// Driver confirms they are fine
    ///
    /// Returns `Ok(false)` when no countdown was running.
    pub async fn cancel_emergency(&self) -> Result<bool, MonitorError> {
        let result = self.request(Command::CancelEmergency).await?;
        Ok(result?)
    }

    /// Clear a finished episode so the emergency screen can be dismissed
    pub async fn reset_emergency(&self) -> Result<bool, MonitorError> {
        let result = self.request(Command::ResetEmergency).await?;
        Ok(result?)
    }

    pub async fn connect_source(&self, kind: TelemetrySourceKind) -> Result<(), MonitorError> {
        self.source_command(kind, SourceAction::Connect).await
    }

    pub async fn disconnect_source(&self, kind: TelemetrySourceKind) -> Result<(), MonitorError> {
        self.source_command(kind, SourceAction::Disconnect).await
    }

    pub async fn retry_source(&self, kind: TelemetrySourceKind) -> Result<(), MonitorError> {
        self.source_command(kind, SourceAction::Retry).await
    }

    /// Stop the loop and wait for every source to close
    pub async fn shutdown(self) -> Result<(), MonitorError> {
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await.map_err(|e| {
            error!("Monitor task failed: {}", e);
            MonitorError::NotRunning
        })
    }

    async fn source_command(&self, kind: TelemetrySourceKind, action: SourceAction) -> Result<(), MonitorError> {
        let result = self
            .request(|reply| Command::Source {
                kind,
                action,
                reply,
            })
            .await?;
        Ok(result?)
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, MonitorError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| MonitorError::NotRunning)?;
        response.await.map_err(|_| MonitorError::NotRunning)
    }
}
