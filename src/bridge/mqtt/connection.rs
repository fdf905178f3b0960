//! Connection state and retry policy for the MQTT bridge
//!
//! Everything here is pure; the client module owns the sockets.

use crate::config::BrokerAddress;
use rumqttc::v5::MqttOptions;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Connection state for the MQTT bridge
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// First connection attempt is in flight
    Connecting,
    /// Session confirmed; publishes are allowed
    Connected,
    /// Connection lost, with the reason
    Disconnected(String),
    /// Reconnection attempt N is in flight
    Reconnecting(u32),
    /// Retries exhausted; the bridge will not recover on its own
    PermanentlyDisconnected(String),
}

/// Retry policy for lost connections.
///
/// The delay ladder is walked once per attempt; attempts past its end reuse
/// `sustained_delay`.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Attempt budget, `None` to retry forever
    pub max_attempts: Option<u32>,
    /// Per-attempt delays in milliseconds
    pub backoff_pattern: Vec<u64>,
    /// Delay once the pattern is exhausted
    pub sustained_delay: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            // The bridge serves an interactive chat session; give up after
            // 20 attempts rather than retrying forever in the background.
            max_attempts: Some(20),
            backoff_pattern: vec![25, 50, 100, 250],
            sustained_delay: 250,
        }
    }
}

impl ReconnectConfig {
    /// Delay in milliseconds before the given attempt (1-based).
    pub fn calculate_backoff_delay(&self, attempt: u32) -> u64 {
        let index = attempt.saturating_sub(1) as usize;
        self.backoff_pattern
            .get(index)
            .copied()
            .unwrap_or(self.sustained_delay)
    }

    /// Worst-case milliseconds spent across the whole attempt budget, or
    /// `None` when retries are unlimited.
    pub fn calculate_max_total_time(&self) -> Option<u64> {
        self.max_attempts.map(|max| {
            (1..=max)
                .map(|attempt| self.calculate_backoff_delay(attempt))
                .sum()
        })
    }
}

static CLIENT_SEQ: AtomicU32 = AtomicU32::new(0);

/// Generate a client id that is unique per connection attempt, so a
/// reconnect can never collide with the broker's half-open previous session.
fn generate_client_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let seq = CLIENT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("archi-{millis}-{seq}")
}

/// Broker options shared between the initial connection and every
/// reconnect attempt.
pub fn configure_mqtt_options(broker: &BrokerAddress) -> MqttOptions {
    let mut options = MqttOptions::new(generate_client_id(), broker.host(), broker.port());
    options.set_keep_alive(Duration::from_secs(60));
    options
}
