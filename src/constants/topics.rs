// Relative to the configured base topic
pub const AVAILABILITY: &str = "status";
pub const ALERT: &str = "alert";
pub const JSON_STATE: &str = "json";

pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";
