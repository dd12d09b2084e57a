use std::time::Duration;

pub const LOG_LEVEL: &str = "info";

pub const EBUS_DEVICE: &str = "/dev/ttyAMA0";
pub const EBUS_BAUDRATE: u32 = 2400;
pub const EBUS_READ_TIMEOUT: Duration = Duration::from_millis(100);
pub const EBUS_RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub const MQTT_HOST: &str = "localhost";
pub const MQTT_PORT: u16 = 1883;
pub const MQTT_CLIENT_PREFIX: &str = "ebus_thelia_bridge";
pub const MQTT_BASE_TOPIC: &str = "ebus/thelia";
pub const MQTT_DISCOVERY_PREFIX: &str = "homeassistant";
pub const MQTT_NODE_ID: &str = "ebus_thelia";
pub const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(60);

pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(30);
pub const STATS_INTERVAL: Duration = Duration::from_secs(60);
pub const SENSOR_MAX_AGE: Duration = Duration::from_secs(300);
