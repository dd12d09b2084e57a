//! eBUS telegram structure and parsing
//!
//! Master part: `QQ ZZ PB SB NN DB1..DBn CRC`
//!
//! For master-slave exchanges the slave answers with `ACK NN DB1..DBm CRC`,
//! which the master acknowledges with a final `ACK`.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::crc;
use super::escape;

pub const BROADCAST_ADDR: u8 = 0xFE;
pub const ACK: u8 = 0x00;
pub const NAK: u8 = 0xFF;

/// QQ ZZ PB SB NN CRC, with NN = 0
pub const MIN_TELEGRAM_LENGTH: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TelegramType {
    /// No response expected
    Broadcast,
    MasterMaster,
    /// Master request followed by a slave response
    MasterSlave,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TelegramError {
    #[error("telegram too short: {0} bytes")]
    TooShort(usize),
    #[error("incomplete telegram: have {have} bytes, need {need}")]
    Incomplete { have: usize, need: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Telegram {
    pub source: u8,
    pub destination: u8,
    pub primary_command: u8,
    pub secondary_command: u8,
    pub data: Vec<u8>,
    pub crc: u8,

    pub slave_ack: Option<u8>,
    pub response_data: Option<Vec<u8>>,
    pub response_crc: Option<u8>,
    pub master_ack: Option<u8>,

    pub telegram_type: TelegramType,
    pub crc_valid: bool,
    pub valid: bool,
    /// Bytes as received, still escaped
    pub raw_bytes: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl Telegram {
    /// Parse the (escaped) bytes found between two SYN symbols
    pub fn parse(raw: &[u8], timestamp: DateTime<Utc>) -> Result<Telegram, TelegramError> {
        let data = escape::unescape(raw);

        if data.len() < MIN_TELEGRAM_LENGTH {
            return Err(TelegramError::TooShort(data.len()));
        }

        let data_length = data[4] as usize;
        let crc_pos = 5 + data_length;
        if data.len() < crc_pos + 1 {
            return Err(TelegramError::Incomplete {
                have: data.len(),
                need: crc_pos + 1,
            });
        }

        let crc = data[crc_pos];
        let expected_crc = crc::crc8(&data[..crc_pos]);
        let crc_valid = crc == expected_crc;
        if !crc_valid {
            log::debug!("CRC mismatch: got 0x{crc:02X}, expected 0x{expected_crc:02X}");
        }

        let mut telegram = Telegram {
            source: data[0],
            destination: data[1],
            primary_command: data[2],
            secondary_command: data[3],
            data: data[5..crc_pos].to_vec(),
            crc,
            slave_ack: None,
            response_data: None,
            response_crc: None,
            master_ack: None,
            telegram_type: TelegramType::Broadcast,
            crc_valid,
            valid: crc_valid,
            raw_bytes: raw.to_vec(),
            timestamp,
        };

        if telegram.destination != BROADCAST_ADDR {
            let remaining = &data[crc_pos + 1..];
            if remaining.is_empty() {
                telegram.telegram_type = TelegramType::MasterMaster;
            } else {
                telegram.telegram_type = TelegramType::MasterSlave;
                telegram.parse_slave_response(remaining);
            }
        }

        Ok(telegram)
    }

    fn parse_slave_response(&mut self, data: &[u8]) {
        let Some(&slave_ack) = data.first() else {
            return;
        };
        self.slave_ack = Some(slave_ack);
        if slave_ack == NAK {
            log::debug!("Slave 0x{:02X} sent NAK for {}", self.destination, self.command_hex());
        }

        if slave_ack != ACK || data.len() < 2 {
            return;
        }

        let response_len = data[1] as usize;
        if data.len() < 2 + response_len + 1 {
            return;
        }

        let response = data[2..2 + response_len].to_vec();
        let response_crc = data[2 + response_len];

        // Response CRC covers NN and the response bytes
        if !crc::verify(&data[1..2 + response_len], response_crc) {
            log::debug!("Slave response CRC mismatch");
            self.valid = false;
        }

        self.response_data = Some(response);
        self.response_crc = Some(response_crc);
        self.master_ack = data.get(2 + response_len + 1).copied();
    }

    pub fn command(&self) -> (u8, u8) {
        (self.primary_command, self.secondary_command)
    }

    /// Command as hex string like `B511`
    pub fn command_hex(&self) -> String {
        format!("{:02X}{:02X}", self.primary_command, self.secondary_command)
    }

    pub fn source_hex(&self) -> String {
        format!("{:02X}", self.source)
    }

    pub fn destination_hex(&self) -> String {
        format!("{:02X}", self.destination)
    }
}

impl fmt::Display for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Telegram[{}](src=0x{:02X}, dst=0x{:02X}, cmd={}, len={}, data={})",
            if self.valid { "ok" } else { "bad" },
            self.source,
            self.destination,
            self.command_hex(),
            self.data.len(),
            hex::encode(&self.data)
        )?;
        if let Some(response) = &self.response_data {
            write!(f, " -> {}", hex::encode(response))?;
        }
        Ok(())
    }
}

/// Largest payload a single length byte can describe
pub const MAX_DATA_LENGTH: usize = u8::MAX as usize;

fn length_byte(data: &[u8]) -> u8 {
    assert!(
        data.len() <= MAX_DATA_LENGTH,
        "eBUS payload of {} bytes exceeds {MAX_DATA_LENGTH}",
        data.len()
    );
    data.len() as u8
}

/// Encode the master part of a telegram, CRC included, escaped for the wire (no SYN).
///
/// # Panics
///
/// If `data` is longer than [`MAX_DATA_LENGTH`].
pub fn encode_master(source: u8, destination: u8, command: (u8, u8), data: &[u8]) -> Vec<u8> {
    let mut frame = vec![source, destination, command.0, command.1, length_byte(data)];
    frame.extend_from_slice(data);
    frame.push(crc::crc8(&frame));
    escape::escape(&frame)
}

/// Encode a complete, acknowledged master-slave exchange, escaped for the wire (no SYN).
///
/// # Panics
///
/// If `data` or `response` is longer than [`MAX_DATA_LENGTH`].
pub fn encode_master_slave(
    source: u8,
    destination: u8,
    command: (u8, u8),
    data: &[u8],
    response: &[u8],
) -> Vec<u8> {
    let mut frame = vec![source, destination, command.0, command.1, length_byte(data)];
    frame.extend_from_slice(data);
    frame.push(crc::crc8(&frame));

    let mut slave = vec![length_byte(response)];
    slave.extend_from_slice(response);
    slave.push(crc::crc8(&slave));

    frame.push(ACK);
    frame.extend_from_slice(&slave);
    frame.push(ACK);
    escape::escape(&frame)
}
