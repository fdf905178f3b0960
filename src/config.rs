//! Environment-backed configuration for the assistant
//!
//! Every MQTT-facing value is required and has no default: a missing or
//! empty variable aborts startup with the offending key named. The lookup
//! itself is injected so the loader can be tested without touching process
//! globals; binaries pass `std::env::var` (after `dotenvy` has run).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::bridge::DeviceId;

/// Required keys.
pub const ENV_BROKER: &str = "MQTTBROKER";
pub const ENV_TEMPERATURE_TOPIC: &str = "TEMP";
pub const ENV_DISPLAY_TOPIC: &str = "DISPLAY";
pub const ENV_DEVICE1_TOPIC: &str = "DEVICE1";
pub const ENV_DEVICE2_TOPIC: &str = "DEVICE2";
pub const ENV_SEARCH_API_KEY: &str = "TAVILY_API_KEY";

/// Optional keys with defaults.
pub const ENV_OLLAMA_URL: &str = "OLLAMA_URL";
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";
pub const ENV_SENSOR_LOG_PATH: &str = "SENSOR_LOG_PATH";

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_sensor_log_path() -> PathBuf {
    PathBuf::from("./log/temp.csv")
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required configuration value '{0}' is not set or is empty")]
    MissingConfiguration(String),
    #[error("invalid broker address '{value}': {reason}")]
    InvalidBrokerAddress { value: String, reason: String },
    #[error("invalid endpoint URL '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },
}

/// Broker network address, parsed once from a `"host:port"` string.
///
/// Immutable after construction; `Display` renders the exact `host:port`
/// form back, so parse/format round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    host: String,
    port: u16,
}

impl BrokerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConfigError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ConfigError::InvalidBrokerAddress {
                value: format!(":{port}"),
                reason: "host is empty".to_string(),
            });
        }
        if port == 0 {
            return Err(ConfigError::InvalidBrokerAddress {
                value: format!("{host}:0"),
                reason: "port must be 1-65535".to_string(),
            });
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for BrokerAddress {
    type Err = ConfigError;

    /// Splits on the last colon, so ports always parse even when the host
    /// itself contains colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidBrokerAddress {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected 'host:port'"))?;
        if host.is_empty() {
            return Err(invalid("host is empty"));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| invalid("port must be a number in 1-65535"))?;
        if port == 0 {
            return Err(invalid("port must be 1-65535"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Broker topics by logical role. All four are required and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    pub temperature: String,
    pub display: String,
    pub device1: String,
    pub device2: String,
}

impl TopicSet {
    pub fn for_device(&self, device: DeviceId) -> &str {
        match device {
            DeviceId::Device1 => &self.device1,
            DeviceId::Device2 => &self.device2,
        }
    }
}

/// Chat model settings. Optional in the environment; the defaults match the
/// deployment this assistant ships with.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            temperature: default_temperature(),
        }
    }
}

/// Complete assistant configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub broker: BrokerAddress,
    pub topics: TopicSet,
    pub search_api_key: String,
    pub llm: LlmSettings,
    pub sensor_log_path: PathBuf,
}

impl AssistantConfig {
    /// Load from process environment (call after `dotenvy::dotenv()`).
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source. The core loader; pure given the
    /// lookup, which keeps it testable without mutating process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let broker: BrokerAddress = required(&lookup, ENV_BROKER)?.parse()?;

        let topics = TopicSet {
            temperature: required(&lookup, ENV_TEMPERATURE_TOPIC)?,
            display: required(&lookup, ENV_DISPLAY_TOPIC)?,
            device1: required(&lookup, ENV_DEVICE1_TOPIC)?,
            device2: required(&lookup, ENV_DEVICE2_TOPIC)?,
        };

        let search_api_key = required(&lookup, ENV_SEARCH_API_KEY)?;

        let base_url = optional(&lookup, ENV_OLLAMA_URL, default_ollama_url());
        Url::parse(&base_url).map_err(|e| ConfigError::InvalidEndpoint {
            value: base_url.clone(),
            reason: e.to_string(),
        })?;

        let llm = LlmSettings {
            base_url,
            model: optional(&lookup, ENV_OLLAMA_MODEL, default_ollama_model()),
            temperature: default_temperature(),
        };

        let sensor_log_path = lookup(ENV_SENSOR_LOG_PATH)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_sensor_log_path);

        Ok(Self {
            broker,
            topics,
            search_api_key,
            llm,
            sensor_log_path,
        })
    }

    /// Human-readable summary with the credential masked, for `config --show`.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("broker            {}\n", self.broker));
        out.push_str(&format!("temperature topic {}\n", self.topics.temperature));
        out.push_str(&format!("display topic     {}\n", self.topics.display));
        out.push_str(&format!("device1 topic     {}\n", self.topics.device1));
        out.push_str(&format!("device2 topic     {}\n", self.topics.device2));
        out.push_str(&format!(
            "search api key    {}\n",
            mask_secret(&self.search_api_key)
        ));
        out.push_str(&format!("ollama url        {}\n", self.llm.base_url));
        out.push_str(&format!("ollama model      {}\n", self.llm.model));
        out.push_str(&format!(
            "sensor log        {}\n",
            self.sensor_log_path.display()
        ));
        out
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingConfiguration(key.to_string())),
    }
}

fn optional<F>(lookup: &F, key: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(default)
}

fn mask_secret(value: &str) -> String {
    format!("set ({} chars)", value.chars().count())
}
