pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const DATA_DIR: &str = "EBB_DATA_DIR";

pub const EBUS_DEVICE: &str = "EBUS_DEVICE";
pub const EBUS_BAUDRATE: &str = "EBUS_BAUDRATE";
pub const EBUS_READ_TIMEOUT_MS: &str = "EBUS_READ_TIMEOUT_MS";
pub const EBUS_RECONNECT_DELAY: &str = "EBUS_RECONNECT_DELAY";

pub const MQTT_HOST: &str = "MQTT_HOST";
pub const MQTT_PORT: &str = "MQTT_PORT";
pub const MQTT_USERNAME: &str = "MQTT_USERNAME";
pub const MQTT_PASSWORD: &str = "MQTT_PASSWORD";
pub const MQTT_CLIENT_PREFIX: &str = "MQTT_CLIENT_PREFIX";
pub const MQTT_BASE_TOPIC: &str = "MQTT_BASE_TOPIC";
pub const MQTT_DISCOVERY_PREFIX: &str = "MQTT_DISCOVERY_PREFIX";
pub const MQTT_JSON: &str = "MQTT_JSON";

pub const PUBLISH_INTERVAL: &str = "PUBLISH_INTERVAL";
pub const STATS_INTERVAL: &str = "STATS_INTERVAL";
pub const SENSOR_MAX_AGE: &str = "SENSOR_MAX_AGE";
