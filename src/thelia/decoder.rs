use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data_mgmt::models::RtValue;
use crate::ebus::Telegram;

use super::messages::{get_message_definition, FieldDefinition};

pub const UNKNOWN: &str = "unknown";

pub fn device_name(addr: u8) -> String {
    match addr {
        0x00 => "broadcast_0".into(),
        0x08 => "boiler".into(),
        0x10 => "mipro".into(),
        0x15 => "room_unit".into(),
        0xFE => "broadcast".into(),
        _ => format!("device_{addr:02X}"),
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ParsedMessage {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub source: u8,
    pub destination: u8,
    pub source_name: String,
    pub dest_name: String,
    pub command: String,
    pub valid: bool,
    pub query_data: BTreeMap<String, RtValue>,
    pub response_data: BTreeMap<String, RtValue>,
    pub units: BTreeMap<String, String>,
    #[serde(skip)]
    pub telegram: Telegram,
}

impl ParsedMessage {
    pub fn is_known(&self) -> bool {
        self.name != UNKNOWN
    }

    /// Look a value up, preferring the slave response over the master query
    pub fn get(&self, key: &str) -> Option<&RtValue> {
        self.response_data
            .get(key)
            .or_else(|| self.query_data.get(key))
    }
}

impl fmt::Display for ParsedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .query_data
            .iter()
            .chain(self.response_data.iter())
            .map(|(key, value)| {
                let unit = match value {
                    RtValue::Int(_) | RtValue::Float(_) => {
                        self.units.get(key).map(String::as_str).unwrap_or("")
                    }
                    _ => "",
                };
                format!("{key}={value}{unit}")
            })
            .collect();
        write!(
            f,
            "{} [{}->{}]: {}",
            self.name,
            self.source_name,
            self.dest_name,
            parts.join(", ")
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    pub total: u64,
    pub parsed: u64,
    pub unknown: u64,
}

/// Maps telegrams onto the known Thelia/MiPro message definitions
#[derive(Debug, Default)]
pub struct MessageDecoder {
    stats: DecoderStats,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, telegram: &Telegram) -> ParsedMessage {
        self.stats.total += 1;

        let mut message = ParsedMessage {
            name: UNKNOWN.to_string(),
            timestamp: telegram.timestamp,
            source: telegram.source,
            destination: telegram.destination,
            source_name: device_name(telegram.source),
            dest_name: device_name(telegram.destination),
            command: telegram.command_hex(),
            valid: telegram.valid,
            query_data: BTreeMap::new(),
            response_data: BTreeMap::new(),
            units: BTreeMap::new(),
            telegram: telegram.clone(),
        };

        let Some(definition) =
            get_message_definition(telegram.primary_command, telegram.secondary_command)
        else {
            self.stats.unknown += 1;
            message
                .query_data
                .insert("raw".into(), RtValue::String(hex::encode(&telegram.data)));
            if let Some(response) = telegram.response_data.as_ref().filter(|r| !r.is_empty()) {
                message
                    .response_data
                    .insert("raw".into(), RtValue::String(hex::encode(response)));
            }
            return message;
        };

        message.name = definition.name.to_string();
        decode_fields(
            &definition.fields,
            &telegram.data,
            &mut message.query_data,
            &mut message.units,
        );
        if let Some(response) = &telegram.response_data {
            decode_fields(
                &definition.response_fields,
                response,
                &mut message.response_data,
                &mut message.units,
            );
        }

        self.stats.parsed += 1;
        message
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}

fn decode_fields(
    fields: &[FieldDefinition],
    data: &[u8],
    values: &mut BTreeMap<String, RtValue>,
    units: &mut BTreeMap<String, String>,
) {
    for field in fields {
        if let Some(value) = field.decode(data) {
            values.insert(field.name.to_string(), value);
            if !field.unit.is_empty() {
                units.insert(field.name.to_string(), field.unit.to_string());
            }
        }
    }
}
