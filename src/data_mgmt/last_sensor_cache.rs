use anyhow::Result;
use chrono::{DateTime, Utc};
use kvstore::KVDb;

use crate::{constants::keys, interfaces::kvpath, thelia::Alert};

use super::models::SensorSnapshot;

pub fn open_cache() -> Result<KVDb> {
    Ok(KVDb::new(kvpath::SQLITE_CACHE.as_path())?)
}

/// Replace the cached snapshot with the latest published one
pub fn save_last_sensors(
    cache: &KVDb,
    sensors: &SensorSnapshot,
    timestamp: DateTime<Utc>,
) -> Result<()> {
    cache.set(keys::LAST_SENSORS, sensors)?;
    cache.set(keys::LAST_SENSORS_TS, timestamp)?;
    log::debug!("[t: {timestamp}] Saved {} sensors to cache", sensors.len());
    Ok(())
}

pub fn load_last_sensors(cache: &KVDb) -> Result<Option<(DateTime<Utc>, SensorSnapshot)>> {
    let timestamp: Option<DateTime<Utc>> = cache.get(keys::LAST_SENSORS_TS)?;
    let sensors: Option<SensorSnapshot> = cache.get(keys::LAST_SENSORS)?;
    Ok(timestamp.zip(sensors))
}

pub fn save_active_alerts(cache: &KVDb, alerts: &[&Alert]) -> Result<()> {
    cache.set(keys::ACTIVE_ALERTS, alerts)?;
    Ok(())
}

pub fn load_active_alerts(cache: &KVDb) -> Result<Vec<Alert>> {
    Ok(cache.get(keys::ACTIVE_ALERTS)?.unwrap_or_default())
}
