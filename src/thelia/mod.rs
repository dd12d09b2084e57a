//! Saunier Duval Thelia Condens / MiPro message set and the state derived from it

pub mod aggregator;
pub mod alerts;
pub mod decoder;
pub mod messages;

pub use aggregator::SensorStore;
pub use alerts::{Alert, AlertLevel, AlertManager};
pub use decoder::{DecoderStats, MessageDecoder, ParsedMessage};
pub use messages::{get_message_definition, list_messages};
