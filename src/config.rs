//! Runtime configuration, read from the environment (optionally populated from `.env`)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{defaults, envvars};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct SerialConfig {
    pub device: String,
    pub baudrate: u32,
    pub read_timeout: Duration,
    pub reconnect_delay: Duration,
}

#[derive(Clone, Debug)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_prefix: String,
    pub base_topic: String,
    pub discovery_prefix: String,
    pub node_id: String,
    /// Also publish the full sensor snapshot as one JSON document
    pub json: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub serial: SerialConfig,
    pub mqtt: MqttConfig,
    pub publish_interval: Duration,
    pub stats_interval: Duration,
    pub sensor_max_age: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            serial: SerialConfig::from_env()?,
            mqtt: MqttConfig::from_env()?,
            publish_interval: env_secs(envvars::PUBLISH_INTERVAL, defaults::PUBLISH_INTERVAL)?,
            stats_interval: env_secs(envvars::STATS_INTERVAL, defaults::STATS_INTERVAL)?,
            sensor_max_age: env_secs(envvars::SENSOR_MAX_AGE, defaults::SENSOR_MAX_AGE)?,
        })
    }
}

impl SerialConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let read_timeout_ms: u64 = env_parse(
            envvars::EBUS_READ_TIMEOUT_MS,
            defaults::EBUS_READ_TIMEOUT.as_millis() as u64,
        )?;
        Ok(SerialConfig {
            device: env_string(envvars::EBUS_DEVICE, defaults::EBUS_DEVICE),
            baudrate: env_parse(envvars::EBUS_BAUDRATE, defaults::EBUS_BAUDRATE)?,
            read_timeout: Duration::from_millis(read_timeout_ms),
            reconnect_delay: env_secs(
                envvars::EBUS_RECONNECT_DELAY,
                defaults::EBUS_RECONNECT_DELAY,
            )?,
        })
    }
}

impl MqttConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(MqttConfig {
            host: env_string(envvars::MQTT_HOST, defaults::MQTT_HOST),
            port: env_parse(envvars::MQTT_PORT, defaults::MQTT_PORT)?,
            username: env_opt(envvars::MQTT_USERNAME),
            password: env_opt(envvars::MQTT_PASSWORD),
            client_prefix: env_string(envvars::MQTT_CLIENT_PREFIX, defaults::MQTT_CLIENT_PREFIX),
            base_topic: env_string(envvars::MQTT_BASE_TOPIC, defaults::MQTT_BASE_TOPIC)
                .trim_end_matches('/')
                .to_string(),
            discovery_prefix: env_string(
                envvars::MQTT_DISCOVERY_PREFIX,
                defaults::MQTT_DISCOVERY_PREFIX,
            ),
            node_id: defaults::MQTT_NODE_ID.to_string(),
            json: env_flag(envvars::MQTT_JSON)?,
        })
    }

    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.base_topic, suffix)
    }
}

fn env_opt(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.is_empty())
}

fn env_string(var: &'static str, default: &str) -> String {
    env_opt(var).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env_opt(var) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn env_secs(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    env_parse(var, default.as_secs()).map(Duration::from_secs)
}

fn env_flag(var: &'static str) -> Result<bool, ConfigError> {
    match env_opt(var) {
        None => Ok(false),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { var, value }),
        },
    }
}
