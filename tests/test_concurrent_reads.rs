//! Concurrent access to the latest-reading cell and the bridge handle
//!
//! The recorder is the only writer; chat tools read through watch receivers
//! or the shared bridge handle. These tests hammer both sides from several
//! tasks to show readers never see a torn, regressing, or vanishing value.

mod test_helpers;

use archi::bridge::mqtt::ReadingRecorder;
use archi::bridge::{DeviceId, MqttBridge};
use archi::sensor_log::{SensorCsvLog, SensorReading};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

const WRITES: usize = 500;
const READS_PER_TASK: usize = 200;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_torn_or_regressing_values() {
    let dir = TempDir::new().expect("temp dir");
    let log = SensorCsvLog::new(dir.path().join("sensor_log.csv"));
    log.ensure_initialized().expect("log init");

    let (latest_tx, latest_rx) = watch::channel(None::<SensorReading>);
    let mut recorder = ReadingRecorder::new("esp32/temp".to_string(), latest_tx, log);

    let mut readers = Vec::new();
    for _ in 0..4 {
        let rx = latest_rx.clone();
        readers.push(tokio::spawn(async move {
            let mut last_seen = f64::NEG_INFINITY;
            let mut saw_reading = false;
            for _ in 0..READS_PER_TASK {
                let observed = *rx.borrow();
                match observed {
                    Some(reading) => {
                        saw_reading = true;
                        // Every written value ends in .25; anything else
                        // means the read was torn.
                        assert_eq!(
                            reading.value.fract(),
                            0.25,
                            "torn value observed: {}",
                            reading.value
                        );
                        assert!(
                            reading.value >= last_seen,
                            "value regressed from {last_seen} to {}",
                            reading.value
                        );
                        last_seen = reading.value;
                    }
                    None => {
                        assert!(!saw_reading, "cell went back to None after a reading");
                    }
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    let writer = tokio::spawn(async move {
        for i in 0..WRITES {
            let payload = format!("{i}.25");
            recorder.handle_publish("esp32/temp", payload.as_bytes(), false);
            if i % 16 == 0 {
                tokio::task::yield_now().await;
            }
        }
    });

    writer.await.expect("writer task");
    for result in futures::future::join_all(readers).await {
        result.expect("reader task");
    }

    assert_eq!(
        latest_rx.borrow().map(|r| r.value),
        Some(499.25),
        "cell must end at the last written value"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bridge_handle_is_shareable_across_tasks() {
    let dir = TempDir::new().expect("temp dir");
    let log_path = dir.path().join("sensor_log.csv");
    let log = SensorCsvLog::new(&log_path);
    log.ensure_initialized().expect("log init");

    // Never connected, so reads return empty state and publishes fail fast.
    let config = test_helpers::test_config("localhost:9994", &log_path);
    let bridge = Arc::new(MqttBridge::new(&config, log));

    let mut tasks = Vec::new();
    for worker in 0..8u32 {
        let bridge = Arc::clone(&bridge);
        tasks.push(tokio::spawn(async move {
            for _ in 0..100 {
                assert_eq!(bridge.current_temperature(), None);
                let _ = bridge.connection_state();
                if worker % 2 == 0 {
                    assert!(bridge.set_device(DeviceId::Device1, true).await.is_err());
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    for result in futures::future::join_all(tasks).await {
        result.expect("bridge task");
    }
}
