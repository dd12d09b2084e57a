use chrono::Utc;
use serde::Serialize;

use super::escape::SYN;
use super::telegram::Telegram;

/// Discard threshold for a buffer that never sees a SYN
const MAX_BUFFER: usize = 512;
const KEEP_ON_OVERFLOW: usize = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FramerStats {
    pub segments: u64,
    pub telegrams: u64,
    pub rejected: u64,
    pub crc_errors: u64,
}

/// Splits a raw eBUS byte stream into telegrams at SYN boundaries.
///
/// A segment is only emitted once the SYN that terminates it has arrived.
#[derive(Debug, Default)]
pub struct TelegramFramer {
    buffer: Vec<u8>,
    stats: FramerStats,
}

impl TelegramFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, data: &[u8]) -> Vec<Telegram> {
        self.buffer.extend_from_slice(data);
        let mut telegrams = Vec::new();

        loop {
            let leading_syn = self.buffer.iter().take_while(|&&b| b == SYN).count();
            self.buffer.drain(..leading_syn);

            if self.buffer.is_empty() {
                break;
            }

            let Some(sync_pos) = self.buffer.iter().position(|&b| b == SYN) else {
                if self.buffer.len() > MAX_BUFFER {
                    log::debug!(
                        "No SYN in {} buffered bytes, discarding all but the last {}",
                        self.buffer.len(),
                        KEEP_ON_OVERFLOW
                    );
                    self.buffer.drain(..self.buffer.len() - KEEP_ON_OVERFLOW);
                }
                break;
            };

            let segment: Vec<u8> = self.buffer.drain(..sync_pos).collect();
            self.stats.segments += 1;

            match Telegram::parse(&segment, Utc::now()) {
                Ok(telegram) => {
                    self.stats.telegrams += 1;
                    if !telegram.valid {
                        self.stats.crc_errors += 1;
                    }
                    log::trace!("{telegram}");
                    telegrams.push(telegram);
                }
                Err(e) => {
                    self.stats.rejected += 1;
                    log::trace!("Dropping segment {}: {e}", hex::encode(&segment));
                }
            }
        }

        telegrams
    }

    /// Clear the internal buffer
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
