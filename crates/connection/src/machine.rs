//! Connection state machine with subscriber notifications

use crate::state::next_state;
use crate::{ConnectionError, ConnectionEvent, ConnectionState};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Finite-state machine for one telemetry source
///
/// Every accepted transition is pushed to every live subscriber, including
/// redundant ones such as `Disconnect` while already disconnected. Rejected
/// events leave the state untouched and notify nobody.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    source: String,
    state: ConnectionState,
    subscribers: Vec<mpsc::UnboundedSender<ConnectionState>>,
}

impl ConnectionStateMachine {
    /// Create a machine in `Disconnected`
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            state: ConnectionState::Disconnected,
            subscribers: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Subscribe to future transitions; drop the receiver to unsubscribe
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConnectionState> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Register an externally created subscriber channel
    pub fn add_subscriber(&mut self, tx: mpsc::UnboundedSender<ConnectionState>) {
        self.subscribers.push(tx);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Apply an event
    pub fn apply(&mut self, event: ConnectionEvent) -> Result<&ConnectionState, ConnectionError> {
        let Some(next) = next_state(&self.state, &event) else {
            warn!(
                "{}: ignoring {:?} while {:?}",
                self.source, event, self.state
            );
            return Err(ConnectionError::InvalidTransition {
                from: self.state.clone(),
                event,
            });
        };

        if next != self.state {
            info!("{}: {:?} -> {:?}", self.source, self.state, next);
        } else {
            debug!("{}: {:?} (unchanged)", self.source, next);
        }
        self.state = next;
        self.notify();

        Ok(&self.state)
    }

    pub fn connect(&mut self) -> Result<&ConnectionState, ConnectionError> {
        self.apply(ConnectionEvent::Connect)
    }

    pub fn device_found(&mut self) -> Result<&ConnectionState, ConnectionError> {
        self.apply(ConnectionEvent::DeviceFound)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<&ConnectionState, ConnectionError> {
        self.apply(ConnectionEvent::Failure(reason.into()))
    }

    pub fn link_lost(&mut self) -> Result<&ConnectionState, ConnectionError> {
        self.apply(ConnectionEvent::LinkLost)
    }

    pub fn retry(&mut self) -> Result<&ConnectionState, ConnectionError> {
        self.apply(ConnectionEvent::Retry)
    }

    /// Always succeeds and always lands in `Disconnected`
    pub fn disconnect(&mut self) -> &ConnectionState {
        self.state = ConnectionState::Disconnected;
        info!("{}: disconnected", self.source);
        self.notify();
        &self.state
    }

    fn notify(&mut self) {
        let state = &self.state;
        self.subscribers.retain(|tx| tx.send(state.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ConnectionState>) -> Vec<ConnectionState> {
        let mut out = Vec::new();
        while let Ok(state) = rx.try_recv() {
            out.push(state);
        }
        out
    }

    #[test]
    fn test_initial_state() {
        let machine = ConnectionStateMachine::new("obd");
        assert_eq!(machine.state(), &ConnectionState::Disconnected);
        assert_eq!(machine.source(), "obd");
    }

    #[test]
    fn test_transitions_are_emitted_in_order() {
        let mut machine = ConnectionStateMachine::new("obd");
        let mut rx = machine.subscribe();

        machine.connect().unwrap();
        machine.device_found().unwrap();
        machine.link_lost().unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                ConnectionState::Scanning,
                ConnectionState::Connected,
                ConnectionState::Disconnected
            ]
        );
    }

    #[test]
    fn test_redundant_disconnect_still_emits() {
        let mut machine = ConnectionStateMachine::new("gps");
        let mut rx = machine.subscribe();

        machine.disconnect();
        machine.disconnect();

        assert_eq!(
            drain(&mut rx),
            vec![ConnectionState::Disconnected, ConnectionState::Disconnected]
        );
    }

    #[test]
    fn test_rejected_event_is_silent() {
        let mut machine = ConnectionStateMachine::new("obd");
        let mut rx = machine.subscribe();

        let err = machine.device_found().unwrap_err();
        assert_eq!(
            err,
            ConnectionError::InvalidTransition {
                from: ConnectionState::Disconnected,
                event: ConnectionEvent::DeviceFound
            }
        );
        assert_eq!(machine.state(), &ConnectionState::Disconnected);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_failure_then_retry() {
        let mut machine = ConnectionStateMachine::new("obd");
        machine.connect().unwrap();
        machine.fail("Bluetooth not powered on").unwrap();
        assert_eq!(
            machine.state(),
            &ConnectionState::Error("Bluetooth not powered on".into())
        );

        assert_eq!(machine.retry().unwrap(), &ConnectionState::Scanning);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut machine = ConnectionStateMachine::new("obd");
        let rx = machine.subscribe();
        let _keep = machine.subscribe();
        drop(rx);

        machine.connect().unwrap();
        assert_eq!(machine.subscriber_count(), 1);
    }

    /// Independent restatement of the transition table
    fn model(state: ConnectionState, event: &ConnectionEvent) -> ConnectionState {
        match event {
            ConnectionEvent::Disconnect => ConnectionState::Disconnected,
            ConnectionEvent::Connect if state == ConnectionState::Disconnected => {
                ConnectionState::Scanning
            }
            ConnectionEvent::DeviceFound if state == ConnectionState::Scanning => {
                ConnectionState::Connected
            }
            ConnectionEvent::Failure(r) if state == ConnectionState::Scanning => {
                ConnectionState::Error(r.clone())
            }
            ConnectionEvent::LinkLost if state == ConnectionState::Connected => {
                ConnectionState::Disconnected
            }
            ConnectionEvent::Retry if state.is_error() => ConnectionState::Scanning,
            _ => state,
        }
    }

    fn any_event() -> impl Strategy<Value = ConnectionEvent> {
        prop_oneof![
            Just(ConnectionEvent::Connect),
            Just(ConnectionEvent::DeviceFound),
            "[a-z ]{1,12}".prop_map(ConnectionEvent::Failure),
            Just(ConnectionEvent::LinkLost),
            Just(ConnectionEvent::Disconnect),
            Just(ConnectionEvent::Retry),
        ]
    }

    proptest! {
        #[test]
        fn prop_state_is_fold_of_table(events in prop::collection::vec(any_event(), 0..40)) {
            let mut machine = ConnectionStateMachine::new("prop");
            let mut rx = machine.subscribe();
            let mut expected = ConnectionState::Disconnected;
            let mut accepted = 0;

            for event in &events {
                if machine.apply(event.clone()).is_ok() {
                    accepted += 1;
                }
                expected = model(expected, event);
                prop_assert_eq!(machine.state(), &expected);
            }

            prop_assert_eq!(drain(&mut rx).len(), accepted);
        }

        #[test]
        fn prop_disconnect_always_lands_disconnected(events in prop::collection::vec(any_event(), 0..20)) {
            let mut machine = ConnectionStateMachine::new("prop");
            for event in events {
                let _ = machine.apply(event);
            }
            prop_assert_eq!(machine.disconnect(), &ConnectionState::Disconnected);
        }
    }
}
