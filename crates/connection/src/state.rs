//! Connection states and the transition table

use serde::{Deserialize, Serialize};

/// Connection state of one telemetry source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No device connected
    #[default]
    Disconnected,
    /// Searching for a compatible device
    Scanning,
    /// Connected and streaming
    Connected,
    /// Scan or connect failed; carries a human-readable cause
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionState::Error(_))
    }
}

/// Transition triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    Connect,
    DeviceFound,
    Failure(String),
    LinkLost,
    Disconnect,
    Retry,
}

/// Transition table
///
/// Returns `None` when `event` is not defined for `state`.
pub fn next_state(state: &ConnectionState, event: &ConnectionEvent) -> Option<ConnectionState> {
    use ConnectionEvent as E;
    use ConnectionState as S;

    match (state, event) {
        (_, E::Disconnect) => Some(S::Disconnected),
        (S::Disconnected, E::Connect) => Some(S::Scanning),
        (S::Scanning, E::DeviceFound) => Some(S::Connected),
        (S::Scanning, E::Failure(reason)) => Some(S::Error(reason.clone())),
        (S::Connected, E::LinkLost) => Some(S::Disconnected),
        (S::Error(_), E::Retry) => Some(S::Scanning),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let s = next_state(&ConnectionState::Disconnected, &ConnectionEvent::Connect).unwrap();
        assert_eq!(s, ConnectionState::Scanning);
        let s = next_state(&s, &ConnectionEvent::DeviceFound).unwrap();
        assert_eq!(s, ConnectionState::Connected);
        let s = next_state(&s, &ConnectionEvent::LinkLost).unwrap();
        assert_eq!(s, ConnectionState::Disconnected);
    }

    #[test]
    fn test_cannot_skip_scanning() {
        assert_eq!(
            next_state(&ConnectionState::Disconnected, &ConnectionEvent::DeviceFound),
            None
        );
        assert_eq!(
            next_state(&ConnectionState::Error("x".into()), &ConnectionEvent::DeviceFound),
            None
        );
    }

    #[test]
    fn test_failure_and_retry() {
        let s = next_state(
            &ConnectionState::Scanning,
            &ConnectionEvent::Failure("Bluetooth not powered on".into()),
        )
        .unwrap();
        assert_eq!(s, ConnectionState::Error("Bluetooth not powered on".into()));
        assert!(s.is_error());
        assert_eq!(
            next_state(&s, &ConnectionEvent::Retry),
            Some(ConnectionState::Scanning)
        );
    }

    #[test]
    fn test_disconnect_from_every_state() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Scanning,
            ConnectionState::Connected,
            ConnectionState::Error("timeout".into()),
        ] {
            assert_eq!(
                next_state(&state, &ConnectionEvent::Disconnect),
                Some(ConnectionState::Disconnected)
            );
        }
    }
}
