//! Impure I/O operations for the MQTT bridge
//!
//! This module handles all impure I/O including network communication,
//! async coordination, and integration with the rumqttc client. The pure
//! decision logic lives in the sibling modules; everything here applies
//! those decisions to real sockets and tasks.

use super::connection::{configure_mqtt_options, ConnectionState, ReconnectConfig};
use super::health::{self, ConnectionEvent, ReconnectStep};
use super::inbound::{EventRoute, EventRouter, ReadingRecorder};
use crate::bridge::{device_command_payload, BridgeError, DeviceBridge, DeviceId};
use crate::config::{AssistantConfig, BrokerAddress, TopicSet};
use crate::sensor_log::{SensorCsvLog, SensorReading};
use async_trait::async_trait;
use rumqttc::v5::mqttbytes::v5::PublishProperties;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// MQTT implementation of the device bridge.
///
/// Constructed once at startup and shared behind an `Arc`; `connect` must be
/// called before the handle is cloned out to the tools. The event loop runs
/// in a supervised background task that owns reconnection.
pub struct MqttDeviceBridge {
    broker: BrokerAddress,
    topics: TopicSet,
    client: Arc<Mutex<AsyncClient>>,
    event_loop: Option<Arc<Mutex<EventLoop>>>,
    recorder: Option<ReadingRecorder>,
    event_loop_handle: Mutex<Option<JoinHandle<()>>>,
    state_rx: Option<watch::Receiver<ConnectionState>>,
    state_tx: Option<watch::Sender<ConnectionState>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    reconnect_config: ReconnectConfig,
    latest_rx: watch::Receiver<Option<SensorReading>>,
}

impl MqttDeviceBridge {
    /// Build the bridge from configuration.
    ///
    /// Ensures the sensor log file and its header exist (idempotent, so
    /// callers that already initialized the log lose nothing). A log that
    /// cannot be created is a warning here; appends keep retrying and
    /// escalate on their own.
    pub fn new(config: &AssistantConfig, log: SensorCsvLog) -> Self {
        if let Err(e) = log.ensure_initialized() {
            warn!(error = %e, "Sensor log initialization failed; readings stay in memory only");
        }

        let mqtt_options = configure_mqtt_options(&config.broker);
        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let (latest_tx, latest_rx) = watch::channel(None);
        let recorder = ReadingRecorder::new(config.topics.temperature.clone(), latest_tx, log);

        MqttDeviceBridge {
            broker: config.broker.clone(),
            topics: config.topics.clone(),
            client: Arc::new(Mutex::new(client)),
            event_loop: Some(Arc::new(Mutex::new(event_loop))),
            recorder: Some(recorder),
            event_loop_handle: Mutex::new(None),
            state_rx: None,
            state_tx: None,
            shutdown_tx: None,
            reconnect_config: ReconnectConfig::default(),
            latest_rx,
        }
    }

    /// Connect to the broker and start the supervised event loop.
    ///
    /// Returns only once the broker has confirmed the connection with a
    /// ConnAck, or with an error after the reconnection budget is spent.
    pub async fn connect(&mut self) -> Result<(), BridgeError> {
        let event_loop = self.event_loop.take().ok_or_else(|| {
            BridgeError::ConnectionFailed("Event loop already started".to_string())
        })?;
        let recorder = self.recorder.take().ok_or_else(|| {
            BridgeError::ConnectionFailed("Event loop already started".to_string())
        })?;

        let ((state_tx, state_rx), (shutdown_tx, shutdown_rx)) = setup_connection_channels();
        self.state_rx = Some(state_rx.clone());
        self.state_tx = Some(state_tx.clone());
        self.shutdown_tx = Some(shutdown_tx);

        let supervisor = EventLoopSupervisor {
            broker: self.broker.clone(),
            temperature_topic: self.topics.temperature.clone(),
            client: self.client.clone(),
            event_loop,
            state_tx,
            shutdown_rx,
            reconnect_config: self.reconnect_config.clone(),
            reconnect_attempts: 0,
            recorder,
        };
        let handle = tokio::spawn(supervisor.run());
        *self.event_loop_handle.lock().await = Some(handle);

        let connection_timeout = health::connection_deadline(&self.reconnect_config);
        wait_for_connection_confirmation(state_rx, connection_timeout).await?;

        Ok(())
    }

    /// Disconnect from the broker and stop the supervisor.
    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
            info!("Sent shutdown signal to event loop supervisor");
        }

        {
            let client = self.client.lock().await;
            client
                .disconnect()
                .await
                .map_err(|e| BridgeError::ConnectionFailed(e.to_string()))?;
        }

        if let Some(state_tx) = &self.state_tx {
            let _ = state_tx.send(ConnectionState::Disconnected(
                "Client disconnected".to_string(),
            ));
        }

        // Give the supervisor time to observe the shutdown signal before
        // falling back to an abort via Drop
        if let Some(handle) = self.event_loop_handle.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(2), handle).await {
                Ok(Ok(())) => {
                    info!("Event loop supervisor shut down gracefully");
                }
                Ok(Err(e)) if !e.is_cancelled() => {
                    warn!("Event loop supervisor ended with error: {}", e);
                }
                Err(_) => {
                    warn!("Event loop supervisor didn't stop in time, aborting");
                }
                _ => {}
            }
        }

        info!("MQTT bridge disconnected");
        Ok(())
    }

    /// Current connection state. Reports `Disconnected` until `connect`
    /// has been called.
    pub fn connection_state(&self) -> ConnectionState {
        match &self.state_rx {
            Some(rx) => rx.borrow().clone(),
            None => ConnectionState::Disconnected("Not started".to_string()),
        }
    }

    /// Latest temperature reading observed on the sensor topic.
    pub fn current_temperature(&self) -> Option<SensorReading> {
        *self.latest_rx.borrow()
    }

    /// Guard publishes against disconnected states.
    fn check_connection_state(&self) -> Result<(), BridgeError> {
        let state_rx = self.state_rx.as_ref().ok_or_else(|| {
            BridgeError::ConnectionFailed("Not connected: connect() has not been called".to_string())
        })?;

        let current_state = state_rx.borrow().clone();
        if !health::can_publish(&current_state) {
            return Err(BridgeError::NotConnected {
                state: current_state,
            });
        }

        Ok(())
    }

    /// Publish a command payload with QoS 1, not retained.
    async fn publish_command(&self, topic: &str, payload: String) -> Result<(), BridgeError> {
        self.check_connection_state()?;

        let client = self.client.lock().await;
        client
            .publish_with_properties(
                topic,
                QoS::AtLeastOnce,
                false,
                payload,
                PublishProperties::default(),
            )
            .await
            .map_err(|e| BridgeError::PublishFailed {
                topic: topic.to_string(),
                source: e,
            })?;

        Ok(())
    }

    /// Publish one character to the configured display topic.
    pub async fn set_display_character(&self, character: char) -> Result<(), BridgeError> {
        let topic = self.topics.display.clone();
        debug!(character = %character, topic = %topic, "Publishing display character");
        self.publish_command(&topic, character.to_string()).await
    }

    /// Publish an on/off command to the configured topic for the device.
    /// Returns the commanded state on success.
    pub async fn set_device(&self, device: DeviceId, on: bool) -> Result<bool, BridgeError> {
        let topic = self.topics.for_device(device).to_string();
        let payload = device_command_payload(on);
        debug!(device = %device, command = payload, topic = %topic, "Publishing device command");
        self.publish_command(&topic, payload.to_string()).await?;
        Ok(on)
    }
}

#[async_trait]
impl DeviceBridge for MqttDeviceBridge {
    fn current_temperature(&self) -> Option<SensorReading> {
        MqttDeviceBridge::current_temperature(self)
    }

    async fn set_display_character(&self, character: char) -> Result<(), BridgeError> {
        MqttDeviceBridge::set_display_character(self, character).await
    }

    async fn set_device(&self, device: DeviceId, on: bool) -> Result<bool, BridgeError> {
        MqttDeviceBridge::set_device(self, device, on).await
    }

    fn connection_state(&self) -> ConnectionState {
        MqttDeviceBridge::connection_state(self)
    }
}

impl Drop for MqttDeviceBridge {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }

        // Drop cannot await a graceful join; disconnect() is the graceful
        // path and this only keeps the task from outliving the bridge
        if let Some(handle) = self.event_loop_handle.get_mut().take() {
            handle.abort();
        }
    }
}

/// Supervised event loop: polls the connection, routes events, and owns
/// the reconnection ladder.
struct EventLoopSupervisor {
    broker: BrokerAddress,
    temperature_topic: String,
    client: Arc<Mutex<AsyncClient>>,
    event_loop: Arc<Mutex<EventLoop>>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_rx: watch::Receiver<bool>,
    reconnect_config: ReconnectConfig,
    reconnect_attempts: u32,
    recorder: ReadingRecorder,
}

impl EventLoopSupervisor {
    async fn run(mut self) {
        info!("Starting MQTT event loop supervisor");

        loop {
            let event_loop = Arc::clone(&self.event_loop);
            tokio::select! {
                // Shutdown wins over event processing
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping event loop supervisor");
                        break;
                    }
                }

                event_result = async move {
                    let mut event_loop_guard = event_loop.lock().await;
                    event_loop_guard.poll().await
                } => {
                    match event_result {
                        Ok(event) => {
                            let route = EventRouter::route_mqtt_event(&event);
                            if !self.process_event_route(route).await {
                                break;
                            }
                        }
                        Err(e) => {
                            if !self.handle_event_loop_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!("MQTT event loop supervisor stopped");
    }

    /// Apply one routed event. Returns false when the loop should stop.
    async fn process_event_route(&mut self, route: EventRoute) -> bool {
        match route {
            EventRoute::ConnectionAcknowledged => {
                let _ = self
                    .state_tx
                    .send(ConnectionEvent::ConnAckReceived.into_state());
                self.reconnect_attempts = 0;
                // Covers both the first connection and every reconnect
                self.subscribe_to_temperature().await;
                true
            }
            EventRoute::MessageReceived {
                topic,
                payload,
                retain,
            } => {
                self.recorder.handle_publish(&topic, &payload, retain);
                true
            }
            EventRoute::Disconnected => {
                let _ = self
                    .state_tx
                    .send(ConnectionEvent::DisconnectedByBroker.into_state());
                self.attempt_reconnection().await
            }
            EventRoute::SubscriptionConfirmed { packet_id } => {
                debug!(packet_id, "Subscription confirmed");
                true
            }
            EventRoute::InfrastructureEvent(event_str) => {
                debug!("MQTT event: {}", event_str);
                true
            }
            EventRoute::OutgoingEvent => true,
        }
    }

    /// Handle an event loop error. Returns false when the loop should stop.
    async fn handle_event_loop_error(&mut self, error: rumqttc::v5::ConnectionError) -> bool {
        let _ = self
            .state_tx
            .send(ConnectionEvent::NetworkError(error.to_string()).into_state());

        self.attempt_reconnection().await
    }

    async fn subscribe_to_temperature(&self) {
        let client = self.client.lock().await;
        match client
            .subscribe(&self.temperature_topic, QoS::AtLeastOnce)
            .await
        {
            Ok(()) => {
                debug!(topic = %self.temperature_topic, "Subscribed to temperature topic");
            }
            Err(e) => {
                error!(
                    "Failed to subscribe to {}: {}",
                    self.temperature_topic, e
                );
            }
        }
    }

    /// Walk the reconnection ladder. Returns false when the loop should stop.
    async fn attempt_reconnection(&mut self) -> bool {
        let step = health::next_reconnect_step(
            self.reconnect_attempts,
            &self.reconnect_config,
            *self.shutdown_rx.borrow(),
        );

        match step {
            ReconnectStep::Retry { attempt, delay_ms } => {
                self.reconnect_attempts = attempt;
                let _ = self
                    .state_tx
                    .send(ConnectionEvent::ReconnectionStarted(attempt).into_state());

                let max_display = self
                    .reconnect_config
                    .max_attempts
                    .map_or("unlimited".to_string(), |max| max.to_string());
                info!(
                    "Attempting reconnection {}/{} after {}ms delay",
                    attempt, max_display, delay_ms
                );

                if !interruptible_sleep(self.shutdown_rx.clone(), delay_ms).await {
                    return false;
                }

                // Final shutdown check before opening a fresh socket
                if *self.shutdown_rx.borrow() {
                    info!("Shutdown signal received, aborting reconnection");
                    return false;
                }

                self.apply_new_connection().await;
                true
            }
            ReconnectStep::GiveUpShutdown => {
                info!("Shutdown signal received, stopping reconnection");
                false
            }
            ReconnectStep::GiveUpExhausted => {
                let max_attempts = self
                    .reconnect_config
                    .max_attempts
                    .unwrap_or(self.reconnect_attempts);
                let reason = format!("Max reconnection attempts ({max_attempts}) exceeded");
                let _ = self
                    .state_tx
                    .send(ConnectionEvent::PermanentFailure(reason).into_state());
                false
            }
        }
    }

    /// Replace the client and event loop with a fresh connection so the
    /// shared handle keeps working after a reconnect.
    async fn apply_new_connection(&mut self) {
        let mqtt_options = configure_mqtt_options(&self.broker);
        let (new_client, new_event_loop) = AsyncClient::new(mqtt_options, 10);

        self.event_loop = Arc::new(Mutex::new(new_event_loop));
        {
            let mut client_guard = self.client.lock().await;
            *client_guard = new_client;
        }
        debug!("Created fresh connection for reconnection attempt");
    }
}

/// Create connection state and shutdown channels.
#[allow(clippy::type_complexity)]
fn setup_connection_channels() -> (
    (
        watch::Sender<ConnectionState>,
        watch::Receiver<ConnectionState>,
    ),
    (watch::Sender<bool>, watch::Receiver<bool>),
) {
    let state_channels = watch::channel(ConnectionState::Connecting);
    let shutdown_channels = watch::channel(false);
    (state_channels, shutdown_channels)
}

/// Wait for the supervisor to report a confirmed connection.
async fn wait_for_connection_confirmation(
    mut state_rx: watch::Receiver<ConnectionState>,
    timeout: Duration,
) -> Result<(), BridgeError> {
    let timeout_result = tokio::time::timeout(timeout, async {
        loop {
            if state_rx.changed().await.is_err() {
                return Err(BridgeError::ConnectionFailed(
                    "State channel closed".to_string(),
                ));
            }
            match *state_rx.borrow() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected(ref reason) => {
                    return Err(BridgeError::ConnectionFailed(reason.clone()));
                }
                ConnectionState::PermanentlyDisconnected(ref reason) => {
                    return Err(BridgeError::ConnectionFailed(format!(
                        "Permanently disconnected: {reason}"
                    )));
                }
                ConnectionState::Connecting => continue,
                ConnectionState::Reconnecting(_) => continue,
            }
        }
    })
    .await;

    match timeout_result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(BridgeError::ConnectionTimeout {
            timeout_secs: timeout.as_secs(),
        }),
    }
}

/// Sleep that a shutdown signal can cut short.
/// Returns true if the sleep completed, false if shutdown was requested.
async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay_ms: u64) -> bool {
    tokio::select! {
        _ = shutdown_rx.changed() => {
            if *shutdown_rx.borrow() {
                info!("Shutdown signal received during reconnection delay, stopping");
                return false;
            }
            true
        }
        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::Duration;

    fn test_config() -> AssistantConfig {
        AssistantConfig::from_lookup(|key| {
            let value = match key {
                "MQTTBROKER" => "localhost:1883",
                "TEMP" => "esp32/temp",
                "DISPLAY" => "esp32/display",
                "DEVICE1" => "esp32/device1",
                "DEVICE2" => "esp32/device2",
                "TAVILY_API_KEY" => "tvly-test",
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap()
    }

    fn test_bridge(dir: &TempDir) -> MqttDeviceBridge {
        let log = SensorCsvLog::new(dir.path().join("temp.csv"));
        log.ensure_initialized().unwrap();
        MqttDeviceBridge::new(&test_config(), log)
    }

    fn test_supervisor(
        dir: &TempDir,
    ) -> (
        EventLoopSupervisor,
        watch::Receiver<ConnectionState>,
        watch::Receiver<Option<SensorReading>>,
        watch::Sender<bool>,
    ) {
        let config = test_config();
        let mqtt_options = configure_mqtt_options(&config.broker);
        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let log = SensorCsvLog::new(dir.path().join("temp.csv"));
        log.ensure_initialized().unwrap();
        let (latest_tx, latest_rx) = watch::channel(None);
        let recorder = ReadingRecorder::new(config.topics.temperature.clone(), latest_tx, log);

        let ((state_tx, state_rx), (shutdown_tx, shutdown_rx)) = setup_connection_channels();
        let supervisor = EventLoopSupervisor {
            broker: config.broker.clone(),
            temperature_topic: config.topics.temperature.clone(),
            client: Arc::new(Mutex::new(client)),
            event_loop: Arc::new(Mutex::new(event_loop)),
            state_tx,
            shutdown_rx,
            reconnect_config: ReconnectConfig::default(),
            reconnect_attempts: 0,
            recorder,
        };
        (supervisor, state_rx, latest_rx, shutdown_tx)
    }

    #[test]
    fn test_setup_connection_channels() {
        let ((state_tx, state_rx), (shutdown_tx, shutdown_rx)) = setup_connection_channels();

        assert_eq!(*state_rx.borrow(), ConnectionState::Connecting);
        assert!(!(*shutdown_rx.borrow()));

        state_tx.send(ConnectionState::Connected).unwrap();
        assert_eq!(*state_rx.borrow(), ConnectionState::Connected);

        shutdown_tx.send(true).unwrap();
        assert!(*shutdown_rx.borrow());
    }

    #[tokio::test]
    async fn test_wait_for_connection_confirmation_success() {
        let ((state_tx, state_rx), (_, _)) = setup_connection_channels();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = state_tx.send(ConnectionState::Connected);
        });

        let result =
            wait_for_connection_confirmation(state_rx, Duration::from_millis(100)).await;
        assert!(result.is_ok(), "Should resolve once Connected is reported");
    }

    #[tokio::test]
    async fn test_wait_for_connection_confirmation_timeout() {
        // Keep state_tx alive so the channel does not close early
        let ((state_tx, state_rx), (_, _)) = setup_connection_channels();

        let _handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(state_tx);
        });

        let result = wait_for_connection_confirmation(state_rx, Duration::from_millis(10)).await;
        assert!(matches!(
            result,
            Err(BridgeError::ConnectionTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_wait_for_connection_confirmation_disconnected() {
        let ((state_tx, state_rx), (_, _)) = setup_connection_channels();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = state_tx.send(ConnectionState::Disconnected("broker refused".to_string()));
        });

        let result =
            wait_for_connection_confirmation(state_rx, Duration::from_millis(100)).await;
        assert!(result.is_err(), "Should fail when disconnected");
        assert!(result.unwrap_err().to_string().contains("broker refused"));
    }

    #[tokio::test]
    async fn test_interruptible_sleep_completes() {
        let ((_, _), (_shutdown_tx, shutdown_rx)) = setup_connection_channels();
        let result = interruptible_sleep(shutdown_rx, 10).await;
        assert!(result, "Sleep should complete without interruption");
    }

    #[tokio::test]
    async fn test_interruptible_sleep_interrupted() {
        let ((_, _), (shutdown_tx, shutdown_rx)) = setup_connection_channels();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = shutdown_tx.send(true);
        });

        let result = interruptible_sleep(shutdown_rx, 100).await;
        assert!(!result, "Sleep should be cut short by the shutdown signal");
    }

    #[tokio::test]
    async fn test_connection_state_before_connect() {
        let dir = TempDir::new().unwrap();
        let bridge = test_bridge(&dir);

        assert!(matches!(
            bridge.connection_state(),
            ConnectionState::Disconnected(_)
        ));
    }

    #[tokio::test]
    async fn test_no_temperature_before_connect() {
        let dir = TempDir::new().unwrap();
        let bridge = test_bridge(&dir);

        assert_eq!(bridge.current_temperature(), None);
    }

    #[tokio::test]
    async fn test_publish_operations_fail_without_connection() {
        let dir = TempDir::new().unwrap();
        let bridge = test_bridge(&dir);

        assert!(
            bridge.set_display_character('A').await.is_err(),
            "set_display_character should fail without connection"
        );
        assert!(
            bridge.set_device(DeviceId::Device1, true).await.is_err(),
            "set_device should fail without connection"
        );
    }

    #[tokio::test]
    async fn test_publish_operations_with_confirmed_state() {
        let dir = TempDir::new().unwrap();
        let mut bridge = test_bridge(&dir);

        // Report a confirmed connection without a broker; rumqttc queues the
        // publishes instead of sending them
        let ((state_tx, state_rx), (_shutdown_tx, _)) = setup_connection_channels();
        state_tx.send(ConnectionState::Connected).unwrap();
        bridge.state_rx = Some(state_rx);
        bridge.state_tx = Some(state_tx);

        bridge.set_display_character('A').await.unwrap();

        let commanded = bridge.set_device(DeviceId::Device1, true).await.unwrap();
        assert!(commanded, "set_device returns the commanded state");
        let commanded = bridge.set_device(DeviceId::Device1, false).await.unwrap();
        assert!(!commanded, "set_device returns the commanded state");
    }

    #[tokio::test]
    async fn test_disconnect_without_connection() {
        let dir = TempDir::new().unwrap();
        let bridge = test_bridge(&dir);

        let result = bridge.disconnect().await;
        assert!(
            result.is_ok(),
            "Disconnect should not fail even if never connected"
        );
    }

    #[tokio::test]
    async fn test_supervisor_connack_confirms_and_subscribes() {
        let dir = TempDir::new().unwrap();
        let (mut supervisor, state_rx, _latest_rx, _shutdown_tx) = test_supervisor(&dir);

        let keep_going = supervisor
            .process_event_route(EventRoute::ConnectionAcknowledged)
            .await;

        assert!(keep_going);
        assert_eq!(*state_rx.borrow(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_supervisor_records_temperature_publish() {
        let dir = TempDir::new().unwrap();
        let (mut supervisor, _state_rx, latest_rx, _shutdown_tx) = test_supervisor(&dir);

        let keep_going = supervisor
            .process_event_route(EventRoute::MessageReceived {
                topic: "esp32/temp".to_string(),
                payload: b"21.5".to_vec(),
                retain: false,
            })
            .await;

        assert!(keep_going);
        assert_eq!(latest_rx.borrow().map(|r| r.value), Some(21.5));

        let contents = std::fs::read_to_string(dir.path().join("temp.csv")).unwrap();
        assert_eq!(contents.lines().count(), 2, "header plus one data row");
    }

    #[tokio::test]
    async fn test_supervisor_stops_on_disconnect_during_shutdown() {
        let dir = TempDir::new().unwrap();
        let (mut supervisor, state_rx, _latest_rx, shutdown_tx) = test_supervisor(&dir);

        shutdown_tx.send(true).unwrap();
        let keep_going = supervisor.process_event_route(EventRoute::Disconnected).await;

        assert!(!keep_going, "Supervisor must stop instead of reconnecting");
        assert!(matches!(
            *state_rx.borrow(),
            ConnectionState::Disconnected(_)
        ));
    }

    #[tokio::test]
    async fn test_supervisor_ignores_infrastructure_events() {
        let dir = TempDir::new().unwrap();
        let (mut supervisor, _state_rx, latest_rx, _shutdown_tx) = test_supervisor(&dir);

        let keep_going = supervisor
            .process_event_route(EventRoute::InfrastructureEvent("PingResp".to_string()))
            .await;

        assert!(keep_going);
        assert_eq!(*latest_rx.borrow(), None);
    }
}
