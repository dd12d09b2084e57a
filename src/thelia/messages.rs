//! Message definitions for the Thelia Condens boiler and MiPro controller

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::data_mgmt::models::{round1, RtValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Uint8,
    Int8,
    Uint16Le,
    Int16Le,
    /// Unsigned byte, half-degree resolution
    Data1c,
    /// Signed 16 bit little endian, 1/256 resolution
    Data2b,
    Temp16,
    Bcd,
    Bit(u8),
    Bytes(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub offset: usize,
    pub data_type: DataType,
    pub unit: &'static str,
    pub description: &'static str,
    pub factor: f64,
    pub offset_value: f64,
}

impl FieldDefinition {
    pub const fn new(name: &'static str, offset: usize, data_type: DataType) -> Self {
        FieldDefinition {
            name,
            offset,
            data_type,
            unit: "",
            description: "",
            factor: 1.0,
            offset_value: 0.0,
        }
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn scale(mut self, factor: f64, offset_value: f64) -> Self {
        self.factor = factor;
        self.offset_value = offset_value;
        self
    }

    /// Decode this field from `data`, or `None` if the data is too short
    pub fn decode(&self, data: &[u8]) -> Option<RtValue> {
        let first = *data.get(self.offset)?;
        let pair = || -> Option<[u8; 2]> {
            data.get(self.offset..self.offset + 2)
                .map(|b| [b[0], b[1]])
        };

        let value = match self.data_type {
            DataType::Uint8 => RtValue::Int(first as i64),
            DataType::Int8 => RtValue::Int(first as i8 as i64),
            DataType::Uint16Le => RtValue::Int(u16::from_le_bytes(pair()?) as i64),
            DataType::Int16Le => RtValue::Int(i16::from_le_bytes(pair()?) as i64),
            DataType::Temp16 | DataType::Data2b => {
                RtValue::Float(round1(i16::from_le_bytes(pair()?) as f64 / 256.0))
            }
            DataType::Data1c => RtValue::Float(round1(first as f64 / 2.0)),
            DataType::Bcd => RtValue::Int(bcd_or_raw(first) as i64),
            DataType::Bit(position) => RtValue::Bool((first >> position) & 1 == 1),
            DataType::Bytes(length) => {
                let end = (self.offset + length).min(data.len());
                RtValue::String(hex::encode(&data[self.offset..end]))
            }
        };

        if self.factor == 1.0 && self.offset_value == 0.0 {
            return Some(value);
        }
        match value.as_f64() {
            Some(v) => Some(RtValue::Float(round1(v * self.factor + self.offset_value))),
            None => Some(value),
        }
    }
}

/// Decode a packed BCD byte; bytes with a nibble above 9 are returned unchanged
pub fn bcd_or_raw(raw: u8) -> u8 {
    let high = raw >> 4;
    let low = raw & 0x0F;
    if high > 9 || low > 9 {
        raw
    } else {
        high * 10 + low
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageDefinition {
    pub name: &'static str,
    pub primary_command: u8,
    pub secondary_command: u8,
    pub description: &'static str,
    pub fields: Vec<FieldDefinition>,
    pub response_fields: Vec<FieldDefinition>,
}

impl MessageDefinition {
    pub fn command(&self) -> (u8, u8) {
        (self.primary_command, self.secondary_command)
    }

    pub fn command_hex(&self) -> String {
        format!("{:02X}{:02X}", self.primary_command, self.secondary_command)
    }
}

use DataType::*;

static MESSAGES: Lazy<BTreeMap<(u8, u8), MessageDefinition>> = Lazy::new(|| {
    let definitions = vec![
        MessageDefinition {
            name: "room_temp",
            primary_command: 0xB5,
            secondary_command: 0x09,
            description: "Room temperature from MiPro controller",
            fields: vec![
                FieldDefinition::new("room_temp", 0, Data1c)
                    .unit("°C")
                    .describe("Current room temperature"),
                FieldDefinition::new("room_setpoint_adjust", 1, Int8)
                    .describe("Room setpoint adjustment"),
            ],
            response_fields: vec![],
        },
        MessageDefinition {
            name: "temp_setpoint",
            primary_command: 0xB5,
            secondary_command: 0x10,
            description: "Temperature setpoint",
            fields: vec![
                FieldDefinition::new("mode1", 0, Uint8).describe("Mode byte 1"),
                FieldDefinition::new("mode2", 1, Uint8).describe("Mode byte 2"),
                FieldDefinition::new("flow_setpoint", 2, Data1c)
                    .unit("°C")
                    .describe("Requested flow temperature"),
                FieldDefinition::new("byte3", 3, Uint8),
                FieldDefinition::new("byte4", 4, Uint8),
                FieldDefinition::new("byte5", 5, Uint8),
                FieldDefinition::new("bytes6_8", 6, Bytes(3)),
            ],
            response_fields: vec![FieldDefinition::new("ack", 0, Uint8)],
        },
        MessageDefinition {
            name: "status_temps",
            primary_command: 0xB5,
            secondary_command: 0x11,
            description: "Status and temperature queries",
            fields: vec![FieldDefinition::new("query_type", 0, Uint8)
                .describe("0=extended, 1=flow temp, 2=setpoints")],
            response_fields: vec![
                FieldDefinition::new("temp1", 0, Temp16).unit("°C"),
                FieldDefinition::new("byte2", 2, Uint8),
                FieldDefinition::new("temp2_raw", 3, Uint16Le),
                FieldDefinition::new("status_byte", 5, Uint8),
                FieldDefinition::new("flags", 6, Bytes(3)),
            ],
        },
        MessageDefinition {
            name: "modulation_outdoor",
            primary_command: 0xB5,
            secondary_command: 0x04,
            description: "Burner modulation and outdoor temperature",
            fields: vec![FieldDefinition::new("query", 0, Uint8)],
            response_fields: vec![
                FieldDefinition::new("modulation", 0, Uint8)
                    .unit("%")
                    .describe("Burner modulation 0-100%"),
                FieldDefinition::new("outdoor_temp_backup", 1, Int8)
                    .unit("°C")
                    .scale(0.5, 0.0),
                FieldDefinition::new("outdoor_temp", 8, Data2b).unit("°C"),
            ],
        },
        MessageDefinition {
            name: "datetime",
            primary_command: 0xB5,
            secondary_command: 0x16,
            description: "Date/time broadcast from MiPro",
            fields: vec![
                FieldDefinition::new("flags", 0, Uint8),
                FieldDefinition::new("seconds", 1, Bcd),
                FieldDefinition::new("minutes", 2, Bcd),
                FieldDefinition::new("hours", 3, Bcd),
                FieldDefinition::new("day", 4, Bcd),
                FieldDefinition::new("month", 5, Bcd),
                FieldDefinition::new("weekday", 6, Uint8),
                FieldDefinition::new("year", 7, Bcd),
            ],
            response_fields: vec![],
        },
        opaque_query("b512_query", 0x12, "B512 query (pressure/DHW?)", true),
        opaque_query("b513_query", 0x13, "B513 query", true),
        opaque_query("b514_query", 0x14, "B514 query (schedule?)", false),
        opaque_query("b515_query", 0x15, "B515 query (errors/history?)", false),
        MessageDefinition {
            name: "device_id",
            primary_command: 0x07,
            secondary_command: 0x04,
            description: "Device identification query",
            fields: vec![],
            response_fields: vec![
                FieldDefinition::new("manufacturer", 0, Uint8),
                FieldDefinition::new("device_id", 1, Bytes(5)),
                FieldDefinition::new("sw_version", 6, Uint16Le),
                FieldDefinition::new("hw_version", 8, Uint16Le),
            ],
        },
        MessageDefinition {
            name: "device_presence",
            primary_command: 0x07,
            secondary_command: 0x00,
            description: "Device presence query",
            fields: vec![],
            response_fields: vec![],
        },
    ];

    definitions
        .into_iter()
        .map(|def| (def.command(), def))
        .collect()
});

/// B512..B515 carry payloads that are not understood yet; keep them as hex
fn opaque_query(
    name: &'static str,
    secondary_command: u8,
    description: &'static str,
    typed_query: bool,
) -> MessageDefinition {
    let fields = if typed_query {
        vec![
            FieldDefinition::new("query_type", 0, Uint8),
            FieldDefinition::new("data", 1, Bytes(9)),
        ]
    } else {
        vec![FieldDefinition::new("data", 0, Bytes(10))]
    };
    MessageDefinition {
        name,
        primary_command: 0xB5,
        secondary_command,
        description,
        fields,
        response_fields: vec![FieldDefinition::new("response", 0, Bytes(10))],
    }
}

pub fn get_message_definition(primary: u8, secondary: u8) -> Option<&'static MessageDefinition> {
    MESSAGES.get(&(primary, secondary))
}

pub fn list_messages() -> Vec<&'static MessageDefinition> {
    MESSAGES.values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_command() {
        let def = get_message_definition(0xB5, 0x11).unwrap();
        assert_eq!(def.name, "status_temps");
        assert_eq!(def.command_hex(), "B511");
        assert!(get_message_definition(0xB5, 0xFF).is_none());
        assert_eq!(list_messages().len(), 11);
    }

    #[test]
    fn decode_basic_types() {
        let data = [0x51, 0xFE, 0x34, 0x12, 0x80, 0xFF];
        assert_eq!(
            FieldDefinition::new("t", 0, Data1c).decode(&data),
            Some(RtValue::Float(40.5))
        );
        assert_eq!(
            FieldDefinition::new("t", 1, Int8).decode(&data),
            Some(RtValue::Int(-2))
        );
        assert_eq!(
            FieldDefinition::new("t", 2, Uint16Le).decode(&data),
            Some(RtValue::Int(0x1234))
        );
        assert_eq!(
            FieldDefinition::new("t", 4, Int16Le).decode(&data),
            Some(RtValue::Int(-128))
        );
        assert_eq!(
            FieldDefinition::new("t", 4, Bit(7)).decode(&data),
            Some(RtValue::Bool(true))
        );
        assert_eq!(
            FieldDefinition::new("t", 4, Bit(0)).decode(&data),
            Some(RtValue::Bool(false))
        );
    }

    #[test]
    fn decode_temp16() {
        // 0x0D80 = 3456 -> 13.5
        let data = [0x80, 0x0D];
        assert_eq!(
            FieldDefinition::new("t", 0, Temp16).decode(&data),
            Some(RtValue::Float(13.5))
        );
        // 0xFE00 = -512 -> -2.0
        assert_eq!(
            FieldDefinition::new("t", 0, Data2b).decode(&[0x00, 0xFE]),
            Some(RtValue::Float(-2.0))
        );
    }

    #[test]
    fn decode_bcd() {
        assert_eq!(bcd_or_raw(0x59), 59);
        assert_eq!(bcd_or_raw(0x3A), 0x3A);
        assert_eq!(
            FieldDefinition::new("t", 0, Bcd).decode(&[0x24]),
            Some(RtValue::Int(24))
        );
    }

    #[test]
    fn out_of_range_is_none() {
        assert_eq!(FieldDefinition::new("t", 3, Uint8).decode(&[0, 1]), None);
        assert_eq!(FieldDefinition::new("t", 1, Uint16Le).decode(&[0, 1]), None);
    }

    #[test]
    fn bytes_are_clipped() {
        assert_eq!(
            FieldDefinition::new("t", 1, Bytes(10)).decode(&[0x00, 0xAB, 0xCD]),
            Some(RtValue::String("abcd".into()))
        );
    }

    #[test]
    fn factor_and_offset_apply_to_numbers_only() {
        let field = FieldDefinition::new("t", 0, Int8).scale(0.5, 0.0);
        assert_eq!(field.decode(&[0xF9]), Some(RtValue::Float(-3.5)));

        let field = FieldDefinition::new("t", 0, Uint8).scale(0.1, 1.0);
        assert_eq!(field.decode(&[15]), Some(RtValue::Float(2.5)));

        let field = FieldDefinition::new("t", 0, Bit(0)).scale(2.0, 1.0);
        assert_eq!(field.decode(&[1]), Some(RtValue::Bool(true)));
    }
}
