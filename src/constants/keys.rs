// Cache keys (stored in SQLITE_CACHE)
pub const LAST_SENSORS: &str = "last_sensors";
pub const LAST_SENSORS_TS: &str = "last_sensors_ts";
pub const ACTIVE_ALERTS: &str = "active_alerts";
