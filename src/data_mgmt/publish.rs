use serde_json::{json, Map, Value};

use crate::config::MqttConfig;
use crate::constants::topics;
use crate::interfaces::mqtt::MqttMessage;
use crate::thelia::aggregator::names;
use crate::thelia::Alert;

use super::models::SensorSnapshot;

const DEVICE_IDENTIFIER: &str = "saunier_duval_thelia_condens";
const DEVICE_NAME: &str = "Saunier Duval Thelia Condens";
const DEVICE_MANUFACTURER: &str = "Saunier Duval";
const DEVICE_MODEL: &str = "Thelia Condens + MiPro";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    Sensor,
    BinarySensor,
}

impl Component {
    fn as_str(&self) -> &'static str {
        match self {
            Component::Sensor => "sensor",
            Component::BinarySensor => "binary_sensor",
        }
    }
}

/// A sensor exposed to Home Assistant
#[derive(Debug)]
pub struct Entity {
    pub key: &'static str,
    pub name: &'static str,
    pub component: Component,
    pub device_class: Option<&'static str>,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
}

impl Entity {
    const fn measurement(
        key: &'static str,
        name: &'static str,
        device_class: Option<&'static str>,
        icon: &'static str,
    ) -> Self {
        Entity {
            key,
            name,
            component: Component::Sensor,
            device_class,
            unit: None,
            icon,
        }
    }

    const fn binary(key: &'static str, name: &'static str, icon: &'static str) -> Self {
        Entity {
            key,
            name,
            component: Component::BinarySensor,
            device_class: None,
            unit: None,
            icon,
        }
    }

    const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        self.unit.or(match self.device_class {
            Some("temperature") => Some("°C"),
            Some("pressure") => Some("bar"),
            _ => None,
        })
    }

    fn object_id(&self) -> String {
        self.key.replace('.', "_")
    }
}

const TEMPERATURE: Option<&str> = Some("temperature");

pub const ENTITIES: [Entity; 13] = [
    Entity::measurement(
        names::FLOW_TEMPERATURE,
        "Boiler Flow Temperature",
        TEMPERATURE,
        "mdi:thermometer-chevron-up",
    ),
    Entity::measurement(
        names::RETURN_TEMPERATURE,
        "Boiler Return Temperature",
        TEMPERATURE,
        "mdi:thermometer-chevron-down",
    ),
    Entity::measurement(
        names::DHW_TANK_TEMPERATURE,
        "DHW Cylinder Temp",
        TEMPERATURE,
        "mdi:water-boiler",
    ),
    Entity::measurement(
        names::OUTDOOR_TEMPERATURE,
        "Outdoor Temperature",
        TEMPERATURE,
        "mdi:sun-thermometer",
    ),
    Entity::measurement(
        names::WATER_PRESSURE,
        "System Pressure",
        Some("pressure"),
        "mdi:gauge",
    ),
    Entity::measurement(
        names::BURNER_MODULATION,
        "Burner Modulation",
        None,
        "mdi:fire",
    )
    .with_unit("%"),
    Entity::measurement(
        names::DELTA_T,
        "Flow-Return Delta",
        TEMPERATURE,
        "mdi:vector-difference-ba",
    ),
    Entity::measurement(
        names::DHW_SETPOINT,
        "DHW Setpoint (Target)",
        TEMPERATURE,
        "mdi:thermostat",
    ),
    Entity::measurement(
        names::ROOM_TEMPERATURE,
        "MiPro Room Temperature",
        TEMPERATURE,
        "mdi:sofa",
    ),
    Entity::binary(names::FLAME_ON, "Burner Flame", "mdi:fire-alert"),
    Entity::binary(names::PUMP_RUNNING, "Pump Status", "mdi:pump"),
    Entity::binary(names::HEATING_ACTIVE, "Heating Mode", "mdi:radiator"),
    Entity::binary(names::DHW_ACTIVE, "DHW Charging Mode", "mdi:water-sync"),
];

fn discovery_payload(config: &MqttConfig, entity: &Entity) -> Value {
    let object_id = entity.object_id();
    let mut payload = Map::new();
    payload.insert("name".into(), json!(format!("Thelia {}", entity.name)));
    payload.insert("unique_id".into(), json!(format!("thelia_ebus_{object_id}")));
    payload.insert("state_topic".into(), json!(config.topic(entity.key)));
    payload.insert(
        "availability_topic".into(),
        json!(config.topic(topics::AVAILABILITY)),
    );
    payload.insert(
        "device".into(),
        json!({
            "identifiers": [DEVICE_IDENTIFIER],
            "name": DEVICE_NAME,
            "manufacturer": DEVICE_MANUFACTURER,
            "model": DEVICE_MODEL,
        }),
    );
    if let Some(class) = entity.device_class {
        payload.insert("device_class".into(), json!(class));
    }
    if let Some(unit) = entity.unit_of_measurement() {
        payload.insert("unit_of_measurement".into(), json!(unit));
    }
    payload.insert("icon".into(), json!(entity.icon));
    if entity.component == Component::Sensor {
        payload.insert("state_class".into(), json!("measurement"));
    }
    Value::Object(payload)
}

/// Retained Home Assistant config messages, one per entity
pub fn discovery_messages(config: &MqttConfig) -> Vec<MqttMessage> {
    ENTITIES
        .iter()
        .map(|entity| {
            let topic = format!(
                "{}/{}/{}/{}/config",
                config.discovery_prefix,
                entity.component.as_str(),
                config.node_id,
                entity.object_id()
            );
            MqttMessage::new(topic, discovery_payload(config, entity).to_string()).retained()
        })
        .collect()
}

pub fn availability_message(config: &MqttConfig, online: bool) -> MqttMessage {
    let payload = if online {
        topics::PAYLOAD_ONLINE
    } else {
        topics::PAYLOAD_OFFLINE
    };
    MqttMessage::new(config.topic(topics::AVAILABILITY), payload).retained()
}

/// One state message per sensor, in the payload format Home Assistant expects
pub fn sensor_messages(config: &MqttConfig, sensors: &SensorSnapshot) -> Vec<MqttMessage> {
    sensors
        .iter()
        .map(|(name, reading)| MqttMessage::new(config.topic(name), reading.value.to_string()))
        .collect()
}

/// Whole snapshot as a single JSON document
pub fn json_message(
    config: &MqttConfig,
    sensors: &SensorSnapshot,
) -> Result<MqttMessage, serde_json::Error> {
    Ok(MqttMessage::new(
        config.topic(topics::JSON_STATE),
        serde_json::to_string(sensors)?,
    ))
}

pub fn alert_message(
    config: &MqttConfig,
    alert: &Alert,
) -> Result<MqttMessage, serde_json::Error> {
    Ok(MqttMessage::new(
        config.topic(topics::ALERT),
        serde_json::to_string(alert)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_mgmt::models::{RtValue, SensorReading};
    use crate::thelia::AlertLevel;
    use chrono::Utc;

    fn config() -> MqttConfig {
        MqttConfig {
            host: "localhost".into(),
            port: 1883,
            username: None,
            password: None,
            client_prefix: "test".into(),
            base_topic: "ebus/thelia".into(),
            discovery_prefix: "homeassistant".into(),
            node_id: "ebus_thelia".into(),
            json: false,
        }
    }

    fn reading(value: RtValue, unit: &str) -> SensorReading {
        SensorReading {
            value,
            unit: unit.into(),
            age_seconds: 1.0,
            description: String::new(),
        }
    }

    fn payload_for(messages: &[MqttMessage], topic: &str) -> Value {
        let msg = messages.iter().find(|m| m.topic == topic).unwrap();
        assert!(msg.retain);
        serde_json::from_str(&msg.payload).unwrap()
    }

    #[test]
    fn temperature_discovery() {
        let messages = discovery_messages(&config());
        assert_eq!(messages.len(), ENTITIES.len());

        let payload = payload_for(
            &messages,
            "homeassistant/sensor/ebus_thelia/boiler_flow_temperature/config",
        );
        assert_eq!(payload["name"], "Thelia Boiler Flow Temperature");
        assert_eq!(payload["unique_id"], "thelia_ebus_boiler_flow_temperature");
        assert_eq!(payload["state_topic"], "ebus/thelia/boiler.flow_temperature");
        assert_eq!(payload["availability_topic"], "ebus/thelia/status");
        assert_eq!(payload["device_class"], "temperature");
        assert_eq!(payload["unit_of_measurement"], "°C");
        assert_eq!(payload["state_class"], "measurement");
        assert_eq!(payload["device"]["identifiers"][0], DEVICE_IDENTIFIER);
        assert_eq!(payload["device"]["model"], DEVICE_MODEL);
    }

    #[test]
    fn pressure_and_explicit_units() {
        let messages = discovery_messages(&config());
        let pressure = payload_for(
            &messages,
            "homeassistant/sensor/ebus_thelia/boiler_water_pressure/config",
        );
        assert_eq!(pressure["unit_of_measurement"], "bar");

        let modulation = payload_for(
            &messages,
            "homeassistant/sensor/ebus_thelia/boiler_burner_modulation/config",
        );
        assert_eq!(modulation["unit_of_measurement"], "%");
        assert!(modulation.get("device_class").is_none());
    }

    #[test]
    fn binary_sensor_discovery() {
        let messages = discovery_messages(&config());
        let flame = payload_for(
            &messages,
            "homeassistant/binary_sensor/ebus_thelia/boiler_flame_on/config",
        );
        assert_eq!(flame["icon"], "mdi:fire-alert");
        assert!(flame.get("unit_of_measurement").is_none());
        assert!(flame.get("state_class").is_none());
    }

    #[test]
    fn state_payloads() {
        let mut sensors = SensorSnapshot::new();
        sensors.insert(names::FLAME_ON.into(), reading(RtValue::Bool(true), ""));
        sensors.insert(names::WATER_PRESSURE.into(), reading(RtValue::Float(1.4), "bar"));
        sensors.insert(names::FLOW_TEMPERATURE.into(), reading(RtValue::Float(45.0), "°C"));

        let messages = sensor_messages(&config(), &sensors);
        assert_eq!(
            messages,
            vec![
                MqttMessage::new("ebus/thelia/boiler.flame_on", "ON"),
                MqttMessage::new("ebus/thelia/boiler.flow_temperature", "45.0"),
                MqttMessage::new("ebus/thelia/boiler.water_pressure", "1.4"),
            ]
        );

        let json = json_message(&config(), &sensors).unwrap();
        assert_eq!(json.topic, "ebus/thelia/json");
        let doc: Value = serde_json::from_str(&json.payload).unwrap();
        assert_eq!(doc["boiler.water_pressure"]["value"], 1.4);
        assert_eq!(doc["boiler.flame_on"]["value"], true);
    }

    #[test]
    fn availability_and_alert() {
        let offline = availability_message(&config(), false);
        assert_eq!(offline.topic, "ebus/thelia/status");
        assert_eq!(offline.payload, "offline");
        assert!(offline.retain);

        let alert = Alert {
            level: AlertLevel::Critical,
            message: "Low water pressure (< 0.8 bar)".into(),
            sensor: names::WATER_PRESSURE.into(),
            value: 0.6,
            timestamp: Utc::now(),
        };
        let msg = alert_message(&config(), &alert).unwrap();
        assert_eq!(msg.topic, "ebus/thelia/alert");
        assert!(!msg.retain);
        let doc: Value = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(doc["level"], "CRITICAL");
    }
}
