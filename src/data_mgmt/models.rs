use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A decoded value, either a message field or an aggregated sensor
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RtValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl RtValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RtValue::Int(i) => Some(*i as f64),
            RtValue::Float(f) => Some(*f),
            RtValue::Bool(_) | RtValue::String(_) => None,
        }
    }
}

/// Booleans render as the ON/OFF that Home Assistant expects
impl fmt::Display for RtValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtValue::Bool(true) => write!(f, "ON"),
            RtValue::Bool(false) => write!(f, "OFF"),
            RtValue::Int(i) => write!(f, "{i}"),
            RtValue::Float(v) => write!(f, "{v:.1}"),
            RtValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for RtValue {
    fn from(b: bool) -> Self {
        RtValue::Bool(b)
    }
}

impl From<i64> for RtValue {
    fn from(i: i64) -> Self {
        RtValue::Int(i)
    }
}

impl From<f64> for RtValue {
    fn from(f: f64) -> Self {
        RtValue::Float(f)
    }
}

impl From<String> for RtValue {
    fn from(s: String) -> Self {
        RtValue::String(s)
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Sensor value as exposed to consumers, with its age at snapshot time
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SensorReading {
    pub value: RtValue,
    pub unit: String,
    pub age_seconds: f64,
    pub description: String,
}

pub type SensorSnapshot = BTreeMap<String, SensorReading>;
