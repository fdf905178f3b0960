//! Test helpers and utilities for integration tests

use archi::config::AssistantConfig;
use std::path::Path;

/// Create a test configuration pointing at the given broker address
#[allow(dead_code)]
pub fn test_config(broker: &str, sensor_log_path: &Path) -> AssistantConfig {
    let broker = broker.to_string();
    let log_path = sensor_log_path.display().to_string();
    AssistantConfig::from_lookup(move |key| {
        let value = match key {
            "MQTTBROKER" => broker.clone(),
            "TEMP" => "esp32/temp".to_string(),
            "DISPLAY" => "esp32/display".to_string(),
            "DEVICE1" => "esp32/device1".to_string(),
            "DEVICE2" => "esp32/device2".to_string(),
            "TAVILY_API_KEY" => "tvly-test-key".to_string(),
            "SENSOR_LOG_PATH" => log_path.clone(),
            _ => return None,
        };
        Some(value)
    })
    .expect("test configuration must load")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_builds_with_given_broker_and_log() {
        let config = test_config("localhost:1883", Path::new("/tmp/archi-test.csv"));
        assert_eq!(config.broker.to_string(), "localhost:1883");
        assert_eq!(config.topics.temperature, "esp32/temp");
        assert_eq!(config.sensor_log_path, PathBuf::from("/tmp/archi-test.csv"));
    }
}
