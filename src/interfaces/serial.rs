//! C6 adapter access: the bus is read as a plain 8N1 UART stream

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;

use crate::config::SerialConfig;
use crate::helpers::backoff_retry;

const READ_CHUNK: usize = 256;
const LOOPBACK_PATTERN: &[u8] = b"PI_UART_ALIVE";
const LOOPBACK_BAUDRATE: u32 = 115_200;
const LOOPBACK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("serial port: {0}")]
    Port(#[from] serialport::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("reader stopped")]
    Stopped,
}

/// Bytes as they came off the wire, stamped on arrival
#[derive(Clone, Debug)]
pub struct RawChunk {
    pub timestamp: DateTime<Utc>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PumpEnd {
    Eof,
    Stopped,
    ReceiverGone,
}

pub fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>, SerialError> {
    let port = serialport::new(config.device.as_str(), config.baudrate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout)
        .open()?;
    log::info!("Connected to {} at {} baud", config.device, config.baudrate);
    Ok(port)
}

/// Forward everything read from `reader` to `sink` until EOF, error, stop or a dropped receiver.
///
/// Read timeouts just mean the bus was quiet.
pub fn pump<R: Read + ?Sized>(
    reader: &mut R,
    sink: &flume::Sender<RawChunk>,
    stop: &AtomicBool,
) -> Result<PumpEnd, SerialError> {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        if stop.load(Ordering::Relaxed) {
            return Ok(PumpEnd::Stopped);
        }
        match reader.read(&mut buf) {
            Ok(0) => return Ok(PumpEnd::Eof),
            Ok(n) => {
                let chunk = RawChunk {
                    timestamp: Utc::now(),
                    bytes: buf[..n].to_vec(),
                };
                if sink.send(chunk).is_err() {
                    return Ok(PumpEnd::ReceiverGone);
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(e.into()),
        }
    }
}

/// Read the adapter on a background thread, reopening the port whenever it fails
pub fn spawn_reader(
    config: SerialConfig,
    sink: flume::Sender<RawChunk>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let opened = backoff_retry(
            || {
                if stop.load(Ordering::Relaxed) {
                    return Err(backoff::Error::permanent(SerialError::Stopped));
                }
                open_port(&config).map_err(backoff::Error::transient)
            },
            config.reconnect_delay,
        );
        let mut port = match opened {
            Ok(port) => port,
            Err(_) => return,
        };

        match pump(&mut port, &sink, &stop) {
            Ok(PumpEnd::Stopped) | Ok(PumpEnd::ReceiverGone) => return,
            Ok(PumpEnd::Eof) => log::warn!("Serial port {} closed", config.device),
            Err(e) => log::error!("Read error on {}: {e}", config.device),
        }
        drop(port);
        thread::sleep(config.reconnect_delay);
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoopbackResult {
    Success,
    Partial(String),
    Nothing,
}

/// Write a test pattern and read it back; only succeeds when TX is bridged to RX
pub fn loopback_check(device: &str) -> Result<LoopbackResult, SerialError> {
    let mut port = serialport::new(device, LOOPBACK_BAUDRATE)
        .timeout(LOOPBACK_TIMEOUT)
        .open()?;
    port.clear(ClearBuffer::All)?;
    loopback(&mut port, LOOPBACK_PATTERN)
}

fn loopback<P: Read + Write + ?Sized>(
    port: &mut P,
    pattern: &[u8],
) -> Result<LoopbackResult, SerialError> {
    port.write_all(pattern)?;
    port.flush()?;
    thread::sleep(Duration::from_millis(100));

    let mut received = Vec::with_capacity(pattern.len());
    let mut buf = [0u8; 64];
    while received.len() < pattern.len() {
        match port.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(if received == pattern {
        LoopbackResult::Success
    } else if received.is_empty() {
        LoopbackResult::Nothing
    } else {
        LoopbackResult::Partial(String::from_utf8_lossy(&received).into_owned())
    })
}
