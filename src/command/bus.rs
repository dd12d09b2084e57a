use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::SerialConfig;
use crate::ebus::{FramerStats, TelegramFramer};
use crate::interfaces::serial::{self, RawChunk};
use crate::thelia::decoder::device_name;
use crate::thelia::{DecoderStats, MessageDecoder, ParsedMessage, SensorStore};

const CHANNEL_CAPACITY: usize = 256;

/// Raw bytes in, decoded messages out, with sensor state kept up to date
pub struct BusPipeline {
    framer: TelegramFramer,
    decoder: MessageDecoder,
    pub store: SensorStore,
}

impl BusPipeline {
    pub fn new(sensor_max_age: Duration) -> Self {
        BusPipeline {
            framer: TelegramFramer::new(),
            decoder: MessageDecoder::new(),
            store: SensorStore::new(sensor_max_age),
        }
    }

    pub fn ingest(&mut self, bytes: &[u8]) -> Vec<ParsedMessage> {
        self.framer
            .feed(bytes)
            .iter()
            .map(|telegram| {
                let msg = self.decoder.decode(telegram);
                self.store.update(&msg);
                msg
            })
            .collect()
    }

    pub fn framer_stats(&self) -> FramerStats {
        self.framer.stats()
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    pub fn log_stats(&self, active_sensors: usize) {
        let framer = self.framer_stats();
        let decoder = self.decoder_stats();
        log::info!(
            "Stats: telegrams={} (crc errors={}, rejected={}), parsed={}, unknown={}, active sensors={}",
            framer.telegrams,
            framer.crc_errors,
            framer.rejected,
            decoder.parsed,
            decoder.unknown,
            active_sensors
        );
    }
}

pub struct BusReader {
    pub chunks: flume::Receiver<RawChunk>,
    pub stop: Arc<AtomicBool>,
    pub handle: JoinHandle<()>,
}

pub fn start_reader(config: &SerialConfig) -> BusReader {
    let (tx, rx) = flume::bounded(CHANNEL_CAPACITY);
    let stop = Arc::new(AtomicBool::new(false));
    let handle = serial::spawn_reader(config.clone(), tx, stop.clone());
    BusReader {
        chunks: rx,
        stop,
        handle,
    }
}

/// Traffic breakdown for capture and replay summaries
#[derive(Debug, Default)]
pub struct TrafficStats {
    pub bytes: usize,
    pub telegrams: u64,
    pub by_source: BTreeMap<u8, u64>,
    pub by_command: BTreeMap<String, u64>,
    pub by_message: BTreeMap<String, u64>,
}

impl TrafficStats {
    pub fn record(&mut self, msg: &ParsedMessage) {
        self.telegrams += 1;
        *self.by_source.entry(msg.source).or_default() += 1;
        *self.by_command.entry(msg.command.clone()).or_default() += 1;
        if msg.is_known() {
            *self.by_message.entry(msg.name.clone()).or_default() += 1;
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", "-".repeat(40));
        let _ = writeln!(out, "Bytes: {}", self.bytes);
        let _ = writeln!(out, "Total telegrams: {}", self.telegrams);

        let _ = writeln!(out, "\n   By source:");
        for (src, count) in &self.by_source {
            let _ = writeln!(out, "      0x{src:02X} ({}): {count}", device_name(*src));
        }
        let _ = writeln!(out, "\n   By command:");
        for (cmd, count) in sorted_by_count(&self.by_command) {
            let _ = writeln!(out, "      {cmd}: {count}");
        }
        if !self.by_message.is_empty() {
            let _ = writeln!(out, "\n   By message:");
            for (name, count) in sorted_by_count(&self.by_message) {
                let _ = writeln!(out, "      {name}: {count}");
            }
        }
        out
    }
}

fn sorted_by_count(counts: &BTreeMap<String, u64>) -> Vec<(&String, &u64)> {
    let mut entries: Vec<_> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    entries
}
