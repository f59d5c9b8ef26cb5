//! Telemetry source actor
//!
//! The spawned task is the sole owner of a source's [`ConnectionStateMachine`]
//! and its [`TelemetryLink`]. Callers drive it through a [`SourceHandle`],
//! which forwards commands over a channel so no two writers ever touch the
//! machine.

use crate::{ConnectionError, ConnectionEvent, ConnectionState, ConnectionStateMachine, LinkError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Hardware binding for a telemetry provider (OBD dongle, GPS receiver)
pub trait TelemetryLink: Send + 'static {
    type Reading: Clone + Send + Sync + 'static;

    /// Discover and open the device
    fn open(&mut self) -> Result<(), LinkError>;

    /// Poll for the latest reading; `Ok(None)` when nothing new is available
    fn read(&mut self) -> Result<Option<Self::Reading>, LinkError>;

    /// Release the device
    fn close(&mut self);
}

/// Source timing
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Time spent scanning before the link is opened
    pub scan_delay: Duration,
    /// Interval between reads while connected
    pub poll_interval: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            scan_delay: Duration::from_secs(2),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Retry,
    Subscribe(mpsc::UnboundedSender<ConnectionState>),
    Shutdown,
}

/// Handle to a running telemetry source
pub struct SourceHandle<R> {
    name: String,
    commands: mpsc::UnboundedSender<Command>,
    readings: watch::Receiver<Option<R>>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl<R: Clone + Send + Sync + 'static> SourceHandle<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start scanning for the device
    pub fn connect(&self) -> Result<(), ConnectionError> {
        self.send(Command::Connect)
    }

    /// Drop the link and any pending scan
    pub fn disconnect(&self) -> Result<(), ConnectionError> {
        self.send(Command::Disconnect)
    }

    /// Scan again after an error
    pub fn retry(&self) -> Result<(), ConnectionError> {
        self.send(Command::Retry)
    }

    /// Subscribe to every subsequent state transition
    pub fn subscribe_state(&self) -> Result<mpsc::UnboundedReceiver<ConnectionState>, ConnectionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send(Command::Subscribe(tx))?;
        Ok(rx)
    }

    /// Most-recent-value stream of readings; `None` until the first arrives
    pub fn readings(&self) -> watch::Receiver<Option<R>> {
        self.readings.clone()
    }

    /// Last known connection state
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Close the link and stop the actor
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }

    fn send(&self, command: Command) -> Result<(), ConnectionError> {
        self.commands
            .send(command)
            .map_err(|_| ConnectionError::SourceClosed(self.name.clone()))
    }
}

/// Spawn the actor for `link` on the current tokio runtime
pub fn spawn_source<R>(
    name: impl Into<String>,
    link: Box<dyn TelemetryLink<Reading = R>>,
    config: SourceConfig,
) -> SourceHandle<R>
where
    R: Clone + Send + Sync + 'static,
{
    let name = name.into();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (readings_tx, readings_rx) = watch::channel(None);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

    info!("Spawning telemetry source {}", name);

    let actor = SourceActor {
        machine: ConnectionStateMachine::new(name.clone()),
        link,
        config,
        readings: readings_tx,
        state: state_tx,
        scan_deadline: None,
    };
    let task = tokio::spawn(actor.run(cmd_rx));

    SourceHandle {
        name,
        commands: cmd_tx,
        readings: readings_rx,
        state: state_rx,
        task,
    }
}

struct SourceActor<R> {
    machine: ConnectionStateMachine,
    link: Box<dyn TelemetryLink<Reading = R>>,
    config: SourceConfig,
    readings: watch::Sender<Option<R>>,
    state: watch::Sender<ConnectionState>,
    scan_deadline: Option<Instant>,
}

impl<R: Clone + Send + Sync + 'static> SourceActor<R> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let connected = self.machine.state().is_connected();

            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(Command::Connect) => self.begin_scan(ConnectionEvent::Connect),
                        Some(Command::Retry) => self.begin_scan(ConnectionEvent::Retry),
                        Some(Command::Disconnect) => {
                            self.scan_deadline = None;
                            self.link.close();
                            self.machine.disconnect();
                            self.publish_state();
                        }
                        Some(Command::Subscribe(tx)) => self.machine.add_subscriber(tx),
                        Some(Command::Shutdown) | None => break,
                    }
                }
                _ = wait_until(self.scan_deadline) => {
                    self.scan_deadline = None;
                    self.finish_scan();
                }
                _ = poll.tick(), if connected => self.poll_link(),
            }
        }

        self.link.close();
        debug!("{}: source actor stopped", self.machine.source());
    }

    fn begin_scan(&mut self, event: ConnectionEvent) {
        if self.apply(event).is_ok() {
            self.scan_deadline = Some(Instant::now() + self.config.scan_delay);
        }
    }

    fn finish_scan(&mut self) {
        let event = match self.link.open() {
            Ok(()) => ConnectionEvent::DeviceFound,
            Err(e) => {
                warn!("{}: {}", self.machine.source(), e);
                ConnectionEvent::Failure(e.to_string())
            }
        };
        let _ = self.apply(event);
    }

    fn poll_link(&mut self) {
        match self.link.read() {
            Ok(Some(reading)) => {
                self.readings.send_replace(Some(reading));
            }
            Ok(None) => {}
            Err(LinkError::Lost(reason)) => {
                warn!("{}: link lost: {}", self.machine.source(), reason);
                self.link.close();
                let _ = self.apply(ConnectionEvent::LinkLost);
            }
            Err(e) => warn!("{}: {}", self.machine.source(), e),
        }
    }

    fn apply(&mut self, event: ConnectionEvent) -> Result<(), ConnectionError> {
        self.machine.apply(event)?;
        self.publish_state();
        Ok(())
    }

    fn publish_state(&self) {
        self.state.send_replace(self.machine.state().clone());
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
