//! eBUS link layer: CRC, byte stuffing, telegram parsing and stream framing

pub mod crc;
pub mod escape;
mod framer;
pub mod telegram;

pub use framer::{FramerStats, TelegramFramer};
pub use telegram::{Telegram, TelegramError, TelegramType};
