//! Threshold alerts on aggregated sensor values

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_mgmt::models::SensorSnapshot;

use super::aggregator::names;

/// Readings older than this are not evaluated against the rules
const MAX_RULE_AGE_SECS: f64 = 300.0;
/// Critical sensors that have not updated for this long raise a staleness alert
const STALE_AFTER_SECS: f64 = 600.0;
const CRITICAL_SENSORS: [&str; 2] = [names::WATER_PRESSURE, names::FLOW_TEMPERATURE];

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug)]
enum Condition {
    Below(f64),
    Above(f64),
}

impl Condition {
    fn holds(&self, value: f64) -> bool {
        match *self {
            Condition::Below(limit) => value < limit,
            Condition::Above(limit) => value > limit,
        }
    }
}

#[derive(Clone, Debug)]
struct Rule {
    sensor: &'static str,
    condition: Condition,
    level: AlertLevel,
    message: &'static str,
}

const RULES: [Rule; 5] = [
    Rule {
        sensor: names::WATER_PRESSURE,
        condition: Condition::Below(0.8),
        level: AlertLevel::Critical,
        message: "Low water pressure (< 0.8 bar)",
    },
    Rule {
        sensor: names::WATER_PRESSURE,
        condition: Condition::Above(2.5),
        level: AlertLevel::Warning,
        message: "High water pressure (> 2.5 bar)",
    },
    Rule {
        sensor: names::RETURN_TEMPERATURE,
        condition: Condition::Above(55.0),
        level: AlertLevel::Info,
        message: "Return temperature high, condensing inefficient (> 55°C)",
    },
    Rule {
        sensor: names::DELTA_T,
        condition: Condition::Above(20.0),
        level: AlertLevel::Warning,
        message: "High flow/return delta (> 20°C)",
    },
    Rule {
        sensor: names::FLOW_TEMPERATURE,
        condition: Condition::Above(80.0),
        level: AlertLevel::Warning,
        message: "High flow temperature (> 80°C)",
    },
];

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub sensor: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (value: {})", self.level, self.message, self.value)
    }
}

/// Tracks which alerts are active so each one is only raised once
#[derive(Debug, Default)]
pub struct AlertManager {
    active: BTreeMap<String, Alert>,
}

impl AlertManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the threshold rules, returning only alerts that were not already active
    pub fn check_sensors(&mut self, sensors: &SensorSnapshot, now: DateTime<Utc>) -> Vec<Alert> {
        let mut raised = Vec::new();

        for rule in &RULES {
            let Some(reading) = sensors.get(rule.sensor) else {
                continue;
            };
            if reading.age_seconds > MAX_RULE_AGE_SECS {
                continue;
            }
            let Some(value) = reading.value.as_f64() else {
                continue;
            };

            let key = format!("{}_{}", rule.sensor, rule.level);
            if rule.condition.holds(value) {
                if !self.active.contains_key(&key) {
                    let alert = Alert {
                        level: rule.level,
                        message: rule.message.to_string(),
                        sensor: rule.sensor.to_string(),
                        value,
                        timestamp: now,
                    };
                    self.active.insert(key, alert.clone());
                    raised.push(alert);
                }
            } else if self.active.remove(&key).is_some() {
                log::info!("Alert cleared: {} on {}", rule.message, rule.sensor);
            }
        }

        raised
    }

    /// Raise a warning for critical sensors that stopped updating.
    ///
    /// Expects a snapshot that still includes stale entries.
    pub fn check_staleness(&mut self, sensors: &SensorSnapshot, now: DateTime<Utc>) -> Vec<Alert> {
        let mut raised = Vec::new();

        for name in CRITICAL_SENSORS {
            let Some(reading) = sensors.get(name) else {
                continue;
            };
            let key = format!("{name}_stale");
            if reading.age_seconds > STALE_AFTER_SECS {
                if !self.active.contains_key(&key) {
                    let alert = Alert {
                        level: AlertLevel::Warning,
                        message: format!("Sensor data stale: {name}"),
                        sensor: name.to_string(),
                        value: reading.age_seconds,
                        timestamp: now,
                    };
                    self.active.insert(key, alert.clone());
                    raised.push(alert);
                }
            } else {
                self.active.remove(&key);
            }
        }

        raised
    }

    pub fn active_alerts(&self) -> Vec<&Alert> {
        self.active.values().collect()
    }
}

pub fn render_status(alerts: &[&Alert]) -> String {
    if alerts.is_empty() {
        return "No active alerts.\n".to_string();
    }
    let rule = "!".repeat(40);
    let mut out = format!("{rule}\nACTIVE ALERTS ({})\n{rule}\n", alerts.len());
    for alert in alerts {
        out.push_str(&format!("   * {alert}\n"));
    }
    out
}
