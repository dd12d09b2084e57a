use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, LastWill, MqttOptions, Outgoing, Packet, QoS,
};
use thiserror::Error;

use crate::config::MqttConfig;
use crate::constants::{defaults, topics};
use crate::data_mgmt::models::SensorSnapshot;
use crate::data_mgmt::publish;
use crate::helpers::rand_hex;
use crate::thelia::Alert;

const RECONNECT_PAUSE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl MqttMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        MqttMessage {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
        }
    }

    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }
}

#[derive(Error, Debug)]
pub enum MqttError {
    #[error(transparent)]
    MqttClient(#[from] rumqttc::ClientError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub fn get_rand_client_id(prefix: Option<&str>) -> String {
    const RAND_ID_BYTES: usize = 3;
    let randhex = rand_hex(RAND_ID_BYTES);

    if let Some(pref) = prefix {
        format!("{pref}-{randhex}")
    } else {
        randhex
    }
}

fn client_conn(config: &MqttConfig, client_id: &str) -> (Client, Connection) {
    log::info!(
        "Establishing MQTT connection to {}:{} as {client_id}",
        config.host,
        config.port
    );

    let mut mqttoptions = MqttOptions::new(client_id, config.host.as_str(), config.port);
    mqttoptions.set_keep_alive(defaults::MQTT_KEEP_ALIVE);
    mqttoptions.set_last_will(LastWill::new(
        config.topic(topics::AVAILABILITY),
        topics::PAYLOAD_OFFLINE,
        QoS::AtLeastOnce,
        true,
    ));
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        mqttoptions.set_credentials(username.as_str(), password.as_str());
    }

    Client::new(mqttoptions, 100)
}

/// Long-lived Home Assistant publisher.
///
/// The connection is driven on its own thread. Every (re)connect queues discovery again, so
/// configs reappear after a broker restart.
pub struct MqttPublisher {
    client: Client,
    client_id: String,
    config: MqttConfig,
    connected: Arc<AtomicBool>,
    discovery_pending: Arc<AtomicBool>,
    _event_loop: JoinHandle<()>,
}

impl MqttPublisher {
    pub fn connect(config: &MqttConfig) -> Self {
        let client_id = get_rand_client_id(Some(&config.client_prefix));
        let (client, connection) = client_conn(config, &client_id);
        let connected = Arc::new(AtomicBool::new(false));
        let discovery_pending = Arc::new(AtomicBool::new(true));

        let event_loop = {
            let connected = connected.clone();
            let discovery_pending = discovery_pending.clone();
            thread::spawn(move || drive_connection(connection, connected, discovery_pending))
        };

        MqttPublisher {
            client,
            client_id,
            config: config.clone(),
            connected,
            discovery_pending,
            _event_loop: event_loop,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn publish_msgs(&self, messages: &[MqttMessage]) -> Result<(), MqttError> {
        for msg in messages {
            log::debug!("Publishing to {}: {}", msg.topic, msg.payload);
            self.client.try_publish(
                msg.topic.clone(),
                QoS::AtLeastOnce,
                msg.retain,
                msg.payload.as_bytes(),
            )?;
        }
        Ok(())
    }

    /// Announce every entity to Home Assistant, then mark the bridge online
    pub fn publish_discovery(&self) -> Result<(), MqttError> {
        if !self.is_connected() {
            return Ok(());
        }
        log::info!("Sending auto-discovery config to Home Assistant");

        let mut messages = publish::discovery_messages(&self.config);
        messages.push(publish::availability_message(&self.config, true));
        self.publish_msgs(&messages)?;
        self.discovery_pending.store(false, Ordering::Relaxed);
        Ok(())
    }

    /// Returns `false` when nothing was sent because the broker is unreachable
    pub fn publish_sensors(&self, sensors: &SensorSnapshot) -> Result<bool, MqttError> {
        if !self.is_connected() {
            return Ok(false);
        }
        if self.discovery_pending.load(Ordering::Relaxed) {
            self.publish_discovery()?;
        }

        let mut messages = publish::sensor_messages(&self.config, sensors);
        if self.config.json {
            messages.push(publish::json_message(&self.config, sensors)?);
        }
        self.publish_msgs(&messages)?;
        Ok(true)
    }

    /// Returns `false` when the alert was not sent, so the caller can retry it later
    pub fn publish_alert(&self, alert: &Alert) -> Result<bool, MqttError> {
        if !self.is_connected() {
            return Ok(false);
        }
        self.publish_msgs(&[publish::alert_message(&self.config, alert)?])?;
        Ok(true)
    }

    /// Mark the bridge offline and close the session
    pub fn disconnect(&self) -> Result<(), MqttError> {
        if self.is_connected() {
            self.publish_msgs(&[publish::availability_message(&self.config, false)])?;
        }
        self.client.try_disconnect()?;
        Ok(())
    }
}

fn drive_connection(
    mut connection: Connection,
    connected: Arc<AtomicBool>,
    discovery_pending: Arc<AtomicBool>,
) {
    for notification in connection.iter() {
        log::trace!("Notification = {:?}", notification);
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    log::info!("Connected to MQTT broker");
                    connected.store(true, Ordering::Relaxed);
                    discovery_pending.store(true, Ordering::Relaxed);
                } else {
                    log::error!("MQTT broker refused connection: {:?}", ack.code);
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::Relaxed);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.store(false, Ordering::Relaxed);
                break;
            }
            Ok(_) => (),
            Err(e) => {
                if connected.swap(false, Ordering::Relaxed) {
                    log::warn!("MQTT connection lost: {e}");
                } else {
                    log::debug!("MQTT connection attempt failed: {e}");
                }
                thread::sleep(RECONNECT_PAUSE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_has_random_suffix() {
        let id = get_rand_client_id(Some("ebus_thelia_bridge"));
        let (prefix, suffix) = id.rsplit_once('-').unwrap();
        assert_eq!(prefix, "ebus_thelia_bridge");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(get_rand_client_id(None).len(), 6);
    }

    #[test]
    fn alert_is_not_reported_sent_without_broker() {
        let config = MqttConfig {
            host: "127.0.0.1".into(),
            port: 1,
            username: None,
            password: None,
            client_prefix: "ebb-test".into(),
            base_topic: "ebus/thelia".into(),
            discovery_prefix: "homeassistant".into(),
            node_id: "ebus_thelia".into(),
            json: false,
        };
        let publisher = MqttPublisher::connect(&config);
        assert!(publisher.client_id().starts_with("ebb-test-"));

        let alert = Alert {
            level: crate::thelia::AlertLevel::Critical,
            message: "Low water pressure (< 0.8 bar)".into(),
            sensor: "boiler.water_pressure".into(),
            value: 0.5,
            timestamp: chrono::Utc::now(),
        };
        assert!(!publisher.is_connected());
        assert!(!publisher.publish_alert(&alert).unwrap());
        assert!(!publisher.publish_sensors(&SensorSnapshot::new()).unwrap());
    }

    #[test]
    fn retained_builder() {
        let msg = MqttMessage::new("ebus/thelia/status", "online");
        assert!(!msg.retain);
        assert!(msg.retained().retain);
    }
}
