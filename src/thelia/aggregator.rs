//! Turns decoded messages into named sensor values for a Thelia Condens boiler
//! with a MiPro controller and a storage cylinder.
//!
//! `0xFF` marks "not available" in every byte position handled here.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::data_mgmt::models::{round1, RtValue, SensorReading, SensorSnapshot};
use crate::helpers::age_secs;

use super::decoder::ParsedMessage;

const NA: u8 = 0xFF;

pub mod names {
    pub const FLOW_TEMPERATURE: &str = "boiler.flow_temperature";
    pub const RETURN_TEMPERATURE: &str = "boiler.return_temperature";
    pub const STORAGE_TEMPERATURE_AUX: &str = "boiler.storage_temperature_aux";
    pub const DHW_TANK_TEMPERATURE: &str = "boiler.dhw_tank_temperature";
    pub const DELTA_T: &str = "boiler.delta_t";
    pub const CONDENSING_POSSIBLE: &str = "boiler.condensing_possible";
    pub const WATER_PRESSURE: &str = "boiler.water_pressure";
    pub const FLAME_ON: &str = "boiler.flame_on";
    pub const PUMP_RUNNING: &str = "boiler.pump_running";
    pub const DHW_ACTIVE: &str = "boiler.dhw_active";
    pub const HEATING_ACTIVE: &str = "boiler.heating_active";
    pub const BURNER_MODULATION: &str = "boiler.burner_modulation";
    pub const DHW_SETPOINT_LOCAL: &str = "boiler.dhw_setpoint_local";
    pub const OUTDOOR_TEMPERATURE: &str = "boiler.outdoor_temperature";
    pub const OUTDOOR_CUTOFF: &str = "mipro.outdoor_cutoff";
    pub const MAX_FLOW_TEMP: &str = "mipro.max_flow_temp";
    pub const DHW_SETPOINT: &str = "mipro.dhw_setpoint";
    pub const ROOM_TEMPERATURE: &str = "mipro.room_temperature";
    pub const ROOM_SETPOINT_ADJUST: &str = "mipro.room_setpoint_adjust";
    pub const TIME: &str = "mipro.time";
    pub const DATE: &str = "mipro.date";
}

use names::*;

#[derive(Clone, Debug)]
struct SensorEntry {
    value: RtValue,
    unit: String,
    timestamp: DateTime<Utc>,
    description: String,
}

/// Latest value of every sensor seen on the bus
#[derive(Debug)]
pub struct SensorStore {
    max_age: Duration,
    sensors: BTreeMap<String, SensorEntry>,
}

impl SensorStore {
    pub fn new(max_age: Duration) -> Self {
        SensorStore {
            max_age,
            sensors: BTreeMap::new(),
        }
    }

    pub fn update(&mut self, msg: &ParsedMessage) {
        if !msg.is_known() || msg.name == "device_id" {
            return;
        }
        if !msg.valid {
            log::debug!("Ignoring {} with bad CRC", msg.name);
            return;
        }

        let ts = msg.timestamp;
        let data = msg.telegram.data.as_slice();
        let resp = msg.telegram.response_data.as_deref().unwrap_or_default();

        match msg.name.as_str() {
            "status_temps" if !data.is_empty() => match data[0] {
                0 if resp.len() >= 8 => self.extract_extended_status(resp, ts),
                1 if resp.len() >= 6 => self.extract_live_temperatures(resp, ts),
                2 if resp.len() >= 6 => self.extract_setpoints(resp, ts),
                _ => (),
            },
            "modulation_outdoor" if resp.len() >= 4 => self.extract_modulation_outdoor(resp, ts),
            "room_temp" if data.len() >= 2 => self.extract_room(data, ts),
            "datetime" if data.len() >= 8 => self.extract_datetime(data, ts),
            _ => (),
        }
    }

    /// B511 query type 1
    fn extract_live_temperatures(&mut self, resp: &[u8], ts: DateTime<Utc>) {
        if let Some(flow) = half(resp[0]).filter(|v| *v > 0.0 && *v < 100.0) {
            self.set(FLOW_TEMPERATURE, flow, "°C", ts, "Flow temperature");
        }
        if let Some(ret) = half(resp[1]).filter(|v| *v > 0.0 && *v < 100.0) {
            self.set(RETURN_TEMPERATURE, ret, "°C", ts, "Return temperature");
        }
        // Secondary tank sensor
        if let Some(aux) = half(resp[2]).filter(|v| (10.0..=85.0).contains(v)) {
            self.set(STORAGE_TEMPERATURE_AUX, aux, "°C", ts, "DHW storage (aux sensor)");
        }
        if let Some(tank) = half(resp[5]).filter(|v| (10.0..=85.0).contains(v)) {
            self.set(DHW_TANK_TEMPERATURE, tank, "°C", ts, "DHW cylinder temperature");
        }

        if let (Some(flow), Some(ret)) = (
            self.float_at(FLOW_TEMPERATURE, ts),
            self.float_at(RETURN_TEMPERATURE, ts),
        ) {
            self.set(DELTA_T, round1(flow - ret), "°C", ts, "Flow - return delta");
            self.set(CONDENSING_POSSIBLE, ret < 55.0, "", ts, "Condensing mode active");
        }
    }

    /// B511 query type 0
    fn extract_extended_status(&mut self, resp: &[u8], ts: DateTime<Utc>) {
        if resp[2] != NA {
            let pressure = round1(resp[2] as f64 / 10.0);
            if (0.1..=4.0).contains(&pressure) {
                self.set(WATER_PRESSURE, pressure, "bar", ts, "Water pressure");
            }
        }
        if resp[7] != NA {
            let status = resp[7];
            self.set(FLAME_ON, status & 0x01 != 0, "", ts, "Burner on");
            self.set(PUMP_RUNNING, status & 0x02 != 0, "", ts, "Pump on");
            self.set(DHW_ACTIVE, status & 0x04 != 0, "", ts, "DHW mode");
            self.set(HEATING_ACTIVE, status & 0x80 != 0, "", ts, "Heating mode");
        }
    }

    /// B511 query type 2
    fn extract_setpoints(&mut self, resp: &[u8], ts: DateTime<Utc>) {
        if resp[0] != NA && resp[0] <= 100 {
            self.set(BURNER_MODULATION, resp[0] as i64, "%", ts, "Modulation level");
        }
        if resp[1] != NA && (5..=30).contains(&resp[1]) {
            self.set(OUTDOOR_CUTOFF, resp[1] as i64, "°C", ts, "Summer/winter threshold");
        }
        if let Some(max_flow) = half(resp[2]).filter(|v| (40.0..=90.0).contains(v)) {
            self.set(MAX_FLOW_TEMP, max_flow, "°C", ts, "Max flow limit");
        }
        if let Some(local) = half(resp[3]) {
            self.set(DHW_SETPOINT_LOCAL, local, "°C", ts, "DHW setpoint (boiler dial)");
        }
        if let Some(setpoint) = half(resp[5]).filter(|v| (30.0..=75.0).contains(v)) {
            self.set(DHW_SETPOINT, setpoint, "°C", ts, "DHW setpoint (MiPro active)");
        }
    }

    /// B504
    fn extract_modulation_outdoor(&mut self, resp: &[u8], ts: DateTime<Utc>) {
        if resp[0] != NA && resp[0] <= 100 {
            self.set(BURNER_MODULATION, resp[0] as i64, "%", ts, "Modulation level");
        }

        if resp.len() >= 10 {
            let raw = i16::from_le_bytes([resp[8], resp[9]]);
            if !matches!(raw, -1 | i16::MAX | i16::MIN) {
                let outdoor = round1(raw as f64 / 256.0);
                if (-40.0..=50.0).contains(&outdoor) {
                    self.set(OUTDOOR_TEMPERATURE, outdoor, "°C", ts, "Outdoor temperature");
                    return;
                }
            }
        }

        // Some firmwares only send a signed half-degree byte
        if resp[1] != NA {
            let outdoor = round1(resp[1] as i8 as f64 / 2.0);
            if (-40.0..=50.0).contains(&outdoor) {
                self.set(OUTDOOR_TEMPERATURE, outdoor, "°C", ts, "Outdoor temperature (backup)");
            }
        }
    }

    /// B509
    fn extract_room(&mut self, data: &[u8], ts: DateTime<Utc>) {
        if let Some(room) = half(data[0]).filter(|v| (5.0..=40.0).contains(v)) {
            self.set(ROOM_TEMPERATURE, room, "°C", ts, "Room temperature");
        }
        if data[1] != NA && data[1] != 0x7F {
            let adjust = data[1] as i8 as i64;
            if (-10..=10).contains(&adjust) {
                self.set(ROOM_SETPOINT_ADJUST, adjust, "", ts, "Room adjust");
            }
        }
    }

    /// B516
    fn extract_datetime(&mut self, data: &[u8], ts: DateTime<Utc>) {
        if data[0] != 0 {
            return;
        }
        let bcd = |b: u8| (b >> 4) as u32 * 10 + (b & 0x0F) as u32;

        let (h, m, s) = (bcd(data[3]), bcd(data[2]), bcd(data[1]));
        if h < 24 && m < 60 {
            self.set(TIME, format!("{h:02}:{m:02}:{s:02}"), "", ts, "Controller time");
        }

        let (day, month, year) = (bcd(data[4]), bcd(data[5]), bcd(data[7]));
        if (1..=12).contains(&month) && (1..=31).contains(&day) {
            self.set(DATE, format!("20{year:02}-{month:02}-{day:02}"), "", ts, "Controller date");
        }
    }

    fn set(
        &mut self,
        name: &str,
        value: impl Into<RtValue>,
        unit: &str,
        timestamp: DateTime<Utc>,
        description: &str,
    ) {
        self.sensors.insert(
            name.to_string(),
            SensorEntry {
                value: value.into(),
                unit: unit.to_string(),
                timestamp,
                description: description.to_string(),
            },
        );
    }

    fn is_fresh(&self, entry: &SensorEntry, now: DateTime<Utc>) -> bool {
        age_secs(entry.timestamp, now) <= self.max_age.as_secs_f64()
    }

    fn float_at(&self, name: &str, now: DateTime<Utc>) -> Option<f64> {
        self.sensor(name, now).and_then(|v| v.as_f64())
    }

    /// Current value of a sensor, or `None` if unknown or older than the max age
    pub fn sensor(&self, name: &str, now: DateTime<Utc>) -> Option<&RtValue> {
        self.sensors
            .get(name)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| &entry.value)
    }

    /// All sensors no older than the max age
    pub fn fresh_sensors(&self, now: DateTime<Utc>) -> SensorSnapshot {
        self.snapshot(now, true)
    }

    /// All sensors ever seen, stale ones included
    pub fn all_sensors(&self, now: DateTime<Utc>) -> SensorSnapshot {
        self.snapshot(now, false)
    }

    fn snapshot(&self, now: DateTime<Utc>, fresh_only: bool) -> SensorSnapshot {
        self.sensors
            .iter()
            .filter(|(_, entry)| !fresh_only || self.is_fresh(entry, now))
            .map(|(name, entry)| {
                (
                    name.clone(),
                    SensorReading {
                        value: entry.value.clone(),
                        unit: entry.unit.clone(),
                        age_seconds: age_secs(entry.timestamp, now),
                        description: entry.description.clone(),
                    },
                )
            })
            .collect()
    }
}

/// Half-degree byte, unless it is the "not available" marker
fn half(raw: u8) -> Option<f64> {
    (raw != NA).then(|| round1(raw as f64 / 2.0))
}

/// Text report of a snapshot, grouped by device
pub fn render_status(sensors: &SensorSnapshot) -> String {
    let mut out = String::new();
    let rule = "=".repeat(70);
    let _ = writeln!(out, "{rule}\nHEATING SYSTEM STATUS\n{rule}");

    for (prefix, title) in [("boiler.", "BOILER"), ("mipro.", "MIPRO")] {
        let group: Vec<_> = sensors
            .iter()
            .filter_map(|(name, reading)| name.strip_prefix(prefix).map(|n| (n, reading)))
            .collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{title}:");
        for (name, reading) in group {
            let value = match reading.value {
                RtValue::Bool(true) => "YES".to_string(),
                RtValue::Bool(false) => "NO".to_string(),
                ref v => format!("{v}{}", reading.unit),
            };
            let _ = writeln!(out, "   {name:25}: {value:10} | {}", reading.description);
        }
    }
    let _ = writeln!(out, "\n{rule}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebus::telegram::{encode_master, encode_master_slave, BROADCAST_ADDR};
    use crate::ebus::Telegram;
    use crate::thelia::decoder::MessageDecoder;

    fn feed(store: &mut SensorStore, raw: Vec<u8>) {
        let telegram = Telegram::parse(&raw, Utc::now()).unwrap();
        let msg = MessageDecoder::new().decode(&telegram);
        store.update(&msg);
    }

    fn status(query_type: u8, resp: &[u8]) -> Vec<u8> {
        encode_master_slave(0x10, 0x08, (0xB5, 0x11), &[query_type], resp)
    }

    fn store() -> SensorStore {
        SensorStore::new(Duration::from_secs(300))
    }

    fn value(store: &SensorStore, name: &str) -> Option<RtValue> {
        store.sensor(name, Utc::now()).cloned()
    }

    #[test]
    fn live_temperatures_and_delta() {
        let mut s = store();
        // flow 55.0, return 40.5, aux 0xFF, tank 0x51 = 40.5
        feed(&mut s, status(1, &[0x6E, 0x51, 0xFF, 0x00, 0x00, 0x51]));
        assert_eq!(value(&s, FLOW_TEMPERATURE), Some(RtValue::Float(55.0)));
        assert_eq!(value(&s, RETURN_TEMPERATURE), Some(RtValue::Float(40.5)));
        assert_eq!(value(&s, STORAGE_TEMPERATURE_AUX), None);
        assert_eq!(value(&s, DHW_TANK_TEMPERATURE), Some(RtValue::Float(40.5)));
        assert_eq!(value(&s, DELTA_T), Some(RtValue::Float(14.5)));
        assert_eq!(value(&s, CONDENSING_POSSIBLE), Some(RtValue::Bool(true)));
    }

    #[test]
    fn live_temperatures_out_of_range_are_dropped() {
        let mut s = store();
        // flow 0.0 is rejected; tank 5.0 is below the plausible range
        feed(&mut s, status(1, &[0x00, 0x51, 0x10, 0x00, 0x00, 0x0A]));
        assert_eq!(value(&s, FLOW_TEMPERATURE), None);
        assert_eq!(value(&s, DHW_TANK_TEMPERATURE), None);
        assert_eq!(value(&s, STORAGE_TEMPERATURE_AUX), None);
        assert_eq!(value(&s, DELTA_T), None);
    }

    #[test]
    fn extended_status_pressure_and_flags() {
        let mut s = store();
        feed(&mut s, status(0, &[0x00, 0x00, 0x0E, 0x00, 0x00, 0x00, 0x00, 0x83]));
        assert_eq!(value(&s, WATER_PRESSURE), Some(RtValue::Float(1.4)));
        assert_eq!(value(&s, FLAME_ON), Some(RtValue::Bool(true)));
        assert_eq!(value(&s, PUMP_RUNNING), Some(RtValue::Bool(true)));
        assert_eq!(value(&s, DHW_ACTIVE), Some(RtValue::Bool(false)));
        assert_eq!(value(&s, HEATING_ACTIVE), Some(RtValue::Bool(true)));
    }

    #[test]
    fn short_response_is_ignored() {
        let mut s = store();
        feed(&mut s, status(0, &[0x00, 0x00, 0x0E]));
        assert!(s.all_sensors(Utc::now()).is_empty());
    }

    #[test]
    fn setpoints() {
        let mut s = store();
        feed(&mut s, status(2, &[0x23, 0x14, 0x96, 0x5A, 0x00, 0x64]));
        assert_eq!(value(&s, BURNER_MODULATION), Some(RtValue::Int(35)));
        assert_eq!(value(&s, OUTDOOR_CUTOFF), Some(RtValue::Int(20)));
        assert_eq!(value(&s, MAX_FLOW_TEMP), Some(RtValue::Float(75.0)));
        assert_eq!(value(&s, DHW_SETPOINT_LOCAL), Some(RtValue::Float(45.0)));
        assert_eq!(value(&s, DHW_SETPOINT), Some(RtValue::Float(50.0)));
    }

    #[test]
    fn outdoor_from_word_then_backup_byte() {
        let mut s = store();
        // 0xFB00 = -1280 / 256 = -5.0
        feed(
            &mut s,
            encode_master_slave(
                0x10,
                0x08,
                (0xB5, 0x04),
                &[0x00],
                &[0x30, 0x10, 0, 0, 0, 0, 0, 0, 0x00, 0xFB],
            ),
        );
        assert_eq!(value(&s, BURNER_MODULATION), Some(RtValue::Int(48)));
        assert_eq!(value(&s, OUTDOOR_TEMPERATURE), Some(RtValue::Float(-5.0)));

        // Word is "not available"; fall back to byte 1 = -6 / 2
        feed(
            &mut s,
            encode_master_slave(
                0x10,
                0x08,
                (0xB5, 0x04),
                &[0x00],
                &[0x30, 0xFA, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF],
            ),
        );
        assert_eq!(value(&s, OUTDOOR_TEMPERATURE), Some(RtValue::Float(-3.0)));
    }

    #[test]
    fn room_temperature_and_adjust() {
        let mut s = store();
        feed(&mut s, encode_master(0x10, BROADCAST_ADDR, (0xB5, 0x09), &[0x2B, 0x03]));
        assert_eq!(value(&s, ROOM_TEMPERATURE), Some(RtValue::Float(21.5)));
        assert_eq!(value(&s, ROOM_SETPOINT_ADJUST), Some(RtValue::Int(3)));

        // 0x7F means "no adjustment reported"
        let mut s = store();
        feed(&mut s, encode_master(0x10, BROADCAST_ADDR, (0xB5, 0x09), &[0x2B, 0x7F]));
        assert_eq!(value(&s, ROOM_SETPOINT_ADJUST), None);
    }

    #[test]
    fn datetime_broadcast() {
        let mut s = store();
        feed(
            &mut s,
            encode_master(
                0x10,
                BROADCAST_ADDR,
                (0xB5, 0x16),
                &[0x00, 0x05, 0x30, 0x14, 0x21, 0x11, 0x02, 0x24],
            ),
        );
        assert_eq!(value(&s, TIME), Some(RtValue::String("14:30:05".into())));
        assert_eq!(value(&s, DATE), Some(RtValue::String("2024-11-21".into())));
    }

    #[test]
    fn invalid_crc_is_ignored() {
        let mut raw = encode_master(0x10, BROADCAST_ADDR, (0xB5, 0x09), &[0x2B, 0x03]);
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let mut s = store();
        feed(&mut s, raw);
        assert!(s.all_sensors(Utc::now()).is_empty());
    }

    #[test]
    fn stale_sensors_are_filtered() {
        let mut s = SensorStore::new(Duration::from_secs(60));
        feed(&mut s, encode_master(0x10, BROADCAST_ADDR, (0xB5, 0x09), &[0x2B, 0x03]));

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert!(s.sensor(ROOM_TEMPERATURE, later).is_none());
        assert!(s.fresh_sensors(later).is_empty());

        let all = s.all_sensors(later);
        assert_eq!(all.len(), 2);
        assert!(all[ROOM_TEMPERATURE].age_seconds >= 119.0);
    }

    #[test]
    fn status_report_groups_by_device() {
        let mut s = store();
        feed(&mut s, encode_master(0x10, BROADCAST_ADDR, (0xB5, 0x09), &[0x2B, 0x03]));
        feed(&mut s, status(0, &[0x00, 0x00, 0x0E, 0x00, 0x00, 0x00, 0x00, 0x01]));
        let report = render_status(&s.fresh_sensors(Utc::now()));
        assert!(report.contains("BOILER:"));
        assert!(report.contains("MIPRO:"));
        assert!(report.contains("water_pressure"));
        assert!(report.contains("1.4bar"));
        assert!(report.contains("YES"));
    }
}
