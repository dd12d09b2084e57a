use std::fs;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;

use crate::argsets::{DecodeArgs, ReplayArgs};
use crate::constants::defaults;
use crate::ebus::escape::SYN;
use crate::thelia::{aggregator, alerts, AlertManager, ParsedMessage};

use super::bus::{BusPipeline, TrafficStats};

/// Accepts hex with or without separators, e.g. `AA 10 FE B5 09 ...` or `10feb509...`
fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    hex::decode(&cleaned).with_context(|| format!("Invalid hex input '{input}'"))
}

fn print_message(msg: &ParsedMessage, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(msg)?);
    } else {
        println!("{}", msg.telegram);
        println!("  {msg}");
    }
    Ok(())
}

/// Frame and decode telegrams given on the command line
pub fn decode(args: DecodeArgs) -> Result<()> {
    let mut bytes = vec![SYN];
    bytes.extend(parse_hex(&args.hex)?);
    bytes.push(SYN);

    let mut pipeline = BusPipeline::new(defaults::SENSOR_MAX_AGE);
    let messages = pipeline.ingest(&bytes);
    if messages.is_empty() {
        return Err(anyhow!("No telegram found in input"));
    }
    for msg in &messages {
        print_message(msg, args.json)?;
    }
    Ok(())
}

/// Decode a raw capture file and report the sensor state it leads to
pub fn replay(args: ReplayArgs) -> Result<()> {
    let raw = fs::read(&args.file)
        .with_context(|| format!("Could not read capture file {}", args.file.display()))?;

    let mut pipeline = BusPipeline::new(defaults::SENSOR_MAX_AGE);
    let mut stats = TrafficStats {
        bytes: raw.len(),
        ..TrafficStats::default()
    };
    // Terminate a trailing segment that was cut off by the end of the capture
    let mut messages = pipeline.ingest(&raw);
    messages.extend(pipeline.ingest(&[SYN]));

    for msg in &messages {
        stats.record(msg);
        if !args.json && msg.is_known() && msg.valid {
            println!("{msg}");
        }
    }

    let now = Utc::now();
    let sensors = pipeline.store.fresh_sensors(now);
    let mut alert_manager = AlertManager::new();
    alert_manager.check_sensors(&sensors, now);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sensors)?);
    } else {
        print!("{}", stats.render());
        print!("{}", aggregator::render_status(&sensors));
        print!("{}", alerts::render_status(&alert_manager.active_alerts()));
    }
    Ok(())
}
