//! Pure routing and ingest logic for MQTT events
//!
//! This module contains pure functions for handling MQTT events and
//! classifying sensor payloads, plus the impure recorder that applies
//! readings to the latest-value cell and the CSV log.

use crate::sensor_log::{FailureStreak, SensorCsvLog, SensorReading};
use rumqttc::v5::Event;
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Pure routing decisions based on MQTT events
pub struct EventRouter;

impl EventRouter {
    /// Route an MQTT v5 event to the appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => {
                use rumqttc::v5::mqttbytes::v5::Packet;
                match incoming {
                    Packet::ConnAck(_) => EventRoute::ConnectionAcknowledged,
                    Packet::Publish(publish) => EventRoute::MessageReceived {
                        topic: String::from_utf8_lossy(&publish.topic).to_string(),
                        payload: publish.payload.to_vec(),
                        retain: publish.retain,
                    },
                    Packet::Disconnect(_) => EventRoute::Disconnected,
                    Packet::SubAck(suback) => EventRoute::SubscriptionConfirmed {
                        packet_id: suback.pkid,
                    },
                    other => EventRoute::InfrastructureEvent(format!("{other:?}")),
                }
            }
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// Classify a publish against the temperature topic (pure function).
    ///
    /// The payload is decoded lossily and trimmed before parsing, since
    /// sensors commonly append a trailing newline.
    pub fn classify_publish(topic: &str, payload: &[u8], temperature_topic: &str) -> PublishKind {
        if topic != temperature_topic {
            return PublishKind::Unrelated;
        }

        let text = String::from_utf8_lossy(payload);
        match text.trim().parse::<f64>() {
            Ok(value) => PublishKind::TemperatureReading(value),
            Err(_) => PublishKind::MalformedTemperature {
                raw: text.to_string(),
            },
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone)]
pub enum EventRoute {
    /// Connection acknowledged - ready to publish/subscribe
    ConnectionAcknowledged,
    /// Message received on a subscribed topic
    MessageReceived {
        topic: String,
        payload: Vec<u8>,
        retain: bool,
    },
    /// MQTT broker disconnected
    Disconnected,
    /// Subscription confirmed by the broker
    SubscriptionConfirmed { packet_id: u16 },
    /// Infrastructure event (PingResp, etc.)
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}

/// What a publish on the wire turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum PublishKind {
    /// Parseable reading from the temperature topic
    TemperatureReading(f64),
    /// Temperature topic payload that does not parse as a number
    MalformedTemperature { raw: String },
    /// Publish on some other topic
    Unrelated,
}

/// Applies classified publishes to the latest-reading cell and CSV log
/// (impure I/O).
///
/// Owned by the event-loop supervisor task; the cell's receivers are handed
/// to the bridge handle so `current_temperature` never blocks on this task.
pub struct ReadingRecorder {
    temperature_topic: String,
    latest_tx: watch::Sender<Option<SensorReading>>,
    log: SensorCsvLog,
    log_failures: FailureStreak,
}

impl ReadingRecorder {
    pub fn new(
        temperature_topic: String,
        latest_tx: watch::Sender<Option<SensorReading>>,
        log: SensorCsvLog,
    ) -> Self {
        Self {
            temperature_topic,
            latest_tx,
            log,
            log_failures: FailureStreak::default(),
        }
    }

    /// Handle one inbound publish.
    ///
    /// Retained publishes are processed like live ones: a retained last
    /// reading is still the latest known temperature.
    pub fn handle_publish(&mut self, topic: &str, payload: &[u8], retain: bool) {
        match EventRouter::classify_publish(topic, payload, &self.temperature_topic) {
            PublishKind::TemperatureReading(value) => {
                let reading = SensorReading::now(value);
                debug!(
                    temperature = value,
                    retain, "Recording temperature reading"
                );
                self.latest_tx.send_replace(Some(reading));
                self.append_to_log(&reading);
            }
            PublishKind::MalformedTemperature { raw } => {
                warn!(
                    topic,
                    payload = raw.as_str(),
                    "Ignoring unparseable temperature payload"
                );
            }
            PublishKind::Unrelated => {
                debug!(topic, "Ignoring message on unrelated topic");
            }
        }
    }

    /// Latest recorded reading, if any.
    pub fn latest(&self) -> Option<SensorReading> {
        *self.latest_tx.borrow()
    }

    fn append_to_log(&mut self, reading: &SensorReading) {
        match self.log.append(reading) {
            Ok(()) => {
                self.log_failures.record_success();
            }
            Err(e) => {
                let failures = self.log_failures.record_failure();
                if FailureStreak::should_escalate(failures) {
                    error!(
                        error = %e,
                        consecutive_failures = failures,
                        "Sensor log keeps failing; readings stay available in memory only"
                    );
                } else {
                    warn!(error = %e, "Failed to append sensor reading to CSV log");
                }
            }
        }
    }
}
