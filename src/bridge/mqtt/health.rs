//! Pure reconnection and state-transition logic for the MQTT bridge
//!
//! The supervisor task applies these decisions; nothing here performs I/O,
//! which keeps the retry policy testable without a broker.

use super::connection::{ConnectionState, ReconnectConfig};
use std::time::Duration;
use tracing::{error, info};

/// Extra time allowed for TCP and MQTT handshakes on top of the retry schedule.
const HANDSHAKE_GRACE_MS: u64 = 30_000;

/// Outcome of consulting the retry policy after a connection loss.
#[derive(Debug, PartialEq)]
pub enum ReconnectStep {
    /// Sleep `delay_ms`, then run reconnection attempt number `attempt`.
    Retry { attempt: u32, delay_ms: u64 },
    /// Stop retrying: the bridge is shutting down.
    GiveUpShutdown,
    /// Stop retrying: the attempt budget is spent.
    GiveUpExhausted,
}

/// Consult the retry policy after `attempts_so_far` failed reconnections.
///
/// Shutdown outranks the attempt budget; a `max_attempts` of `None` retries
/// forever.
pub fn next_reconnect_step(
    attempts_so_far: u32,
    config: &ReconnectConfig,
    shutdown_requested: bool,
) -> ReconnectStep {
    if shutdown_requested {
        return ReconnectStep::GiveUpShutdown;
    }

    let exhausted = config
        .max_attempts
        .is_some_and(|max| attempts_so_far >= max);
    if exhausted {
        return ReconnectStep::GiveUpExhausted;
    }

    let attempt = attempts_so_far + 1;
    ReconnectStep::Retry {
        attempt,
        delay_ms: config.calculate_backoff_delay(attempt),
    }
}

/// How long `connect` waits for a confirmed session before giving up.
///
/// Bounded configs get their worst-case retry time plus a handshake grace
/// period; unlimited configs fall back to a flat minute.
pub fn connection_deadline(config: &ReconnectConfig) -> Duration {
    config
        .calculate_max_total_time()
        .map(|total| Duration::from_millis(total + HANDSHAKE_GRACE_MS))
        .unwrap_or(Duration::from_secs(60))
}

/// Publishes are only allowed on a confirmed session.
pub fn can_publish(state: &ConnectionState) -> bool {
    matches!(state, ConnectionState::Connected)
}

/// Events observed on the MQTT event loop that move the connection state.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Broker acknowledged the session
    ConnAckReceived,
    /// Broker closed the connection
    DisconnectedByBroker,
    /// Transport or protocol failure
    NetworkError(String),
    /// A reconnection attempt is starting
    ReconnectionStarted(u32),
    /// Retries are exhausted or impossible
    PermanentFailure(String),
}

impl ConnectionEvent {
    /// The connection state this event moves the bridge into.
    ///
    /// Transitions do not depend on the previous state; the event alone
    /// carries enough information. Logging happens here so every state
    /// change is visible no matter which supervisor path produced it.
    pub fn into_state(self) -> ConnectionState {
        match self {
            Self::ConnAckReceived => {
                info!("MQTT bridge connected");
                ConnectionState::Connected
            }
            Self::DisconnectedByBroker => {
                info!("MQTT broker closed the connection");
                ConnectionState::Disconnected("Broker disconnected".to_string())
            }
            Self::NetworkError(reason) => {
                error!(error = %reason, "MQTT event loop error");
                ConnectionState::Disconnected(reason)
            }
            Self::ReconnectionStarted(attempt) => {
                info!(attempt, "Starting MQTT reconnection");
                ConnectionState::Reconnecting(attempt)
            }
            Self::PermanentFailure(reason) => {
                error!(reason = %reason, "Giving up on MQTT connection");
                ConnectionState::PermanentlyDisconnected(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_schedule_walks_ladder_then_sustains() {
        let config = ReconnectConfig::default();

        // (failures so far, next attempt, delay before it)
        let schedule = [(0, 1, 25), (1, 2, 50), (2, 3, 100), (3, 4, 250), (5, 6, 250)];
        for (done, attempt, delay_ms) in schedule {
            assert_eq!(
                next_reconnect_step(done, &config, false),
                ReconnectStep::Retry { attempt, delay_ms },
                "after {done} failures"
            );
        }
    }

    #[test]
    fn test_shutdown_wins_over_retry_budget() {
        let config = ReconnectConfig::default();

        assert_eq!(
            next_reconnect_step(0, &config, true),
            ReconnectStep::GiveUpShutdown
        );
        // Shutdown outranks exhaustion when both hold
        assert_eq!(
            next_reconnect_step(99, &config, true),
            ReconnectStep::GiveUpShutdown
        );
    }

    #[test]
    fn test_attempt_budget_exhaustion() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_attempts, Some(20));
        assert_eq!(
            next_reconnect_step(20, &config, false),
            ReconnectStep::GiveUpExhausted
        );

        let unlimited = ReconnectConfig {
            max_attempts: None,
            ..ReconnectConfig::default()
        };
        assert!(matches!(
            next_reconnect_step(500, &unlimited, false),
            ReconnectStep::Retry { attempt: 501, .. }
        ));
    }

    #[test]
    fn test_connection_deadline() {
        // Bounded default: the full 4425ms ladder plus handshake grace
        assert_eq!(
            connection_deadline(&ReconnectConfig::default()),
            Duration::from_millis(4425 + 30_000)
        );

        let unlimited = ReconnectConfig {
            max_attempts: None,
            ..ReconnectConfig::default()
        };
        assert_eq!(connection_deadline(&unlimited), Duration::from_secs(60));
    }

    #[test]
    fn test_events_map_to_states() {
        assert_eq!(
            ConnectionEvent::ConnAckReceived.into_state(),
            ConnectionState::Connected
        );
        assert_eq!(
            ConnectionEvent::DisconnectedByBroker.into_state(),
            ConnectionState::Disconnected("Broker disconnected".to_string())
        );
        assert_eq!(
            ConnectionEvent::NetworkError("timeout".to_string()).into_state(),
            ConnectionState::Disconnected("timeout".to_string())
        );
        assert_eq!(
            ConnectionEvent::ReconnectionStarted(4).into_state(),
            ConnectionState::Reconnecting(4)
        );
        assert_eq!(
            ConnectionEvent::PermanentFailure("attempts exhausted".to_string()).into_state(),
            ConnectionState::PermanentlyDisconnected("attempts exhausted".to_string())
        );
    }

    #[test]
    fn test_only_connected_sessions_accept_publishes() {
        assert!(can_publish(&ConnectionState::Connected));

        for state in [
            ConnectionState::Connecting,
            ConnectionState::Disconnected("io".to_string()),
            ConnectionState::Reconnecting(1),
            ConnectionState::PermanentlyDisconnected("io".to_string()),
        ] {
            assert!(!can_publish(&state), "{state:?} must refuse publishes");
        }
    }
}
