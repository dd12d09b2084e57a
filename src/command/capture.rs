use std::fs::File;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::time::Instant;

use anyhow::Result;
use flume::RecvTimeoutError;

use crate::argsets::CaptureArgs;
use crate::config::Config;
use crate::helpers::clock_millis;

use super::bus::{self, BusPipeline, TrafficStats};

/// Dump raw bus traffic for a fixed time, optionally to a file `replay` can read back
pub fn capture(args: CaptureArgs) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(device) = args.device {
        config.serial.device = device;
    }

    let mut out = match &args.output {
        Some(path) => {
            println!("Saving raw bytes to {}", path.display());
            Some(File::create(path)?)
        }
        None => None,
    };

    println!(
        "Capturing raw eBUS traffic on {} for {}s",
        config.serial.device,
        args.duration.as_secs()
    );
    println!("{}", "=".repeat(70));

    let reader = bus::start_reader(&config.serial);
    let mut pipeline = BusPipeline::new(config.sensor_max_age);
    let mut stats = TrafficStats::default();
    let started = Instant::now();

    while let Some(remaining) = args.duration.checked_sub(started.elapsed()) {
        let chunk = match reader.chunks.recv_timeout(remaining) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("Serial reader stopped");
                break;
            }
        };

        stats.bytes += chunk.bytes.len();
        if let Some(file) = out.as_mut() {
            file.write_all(&chunk.bytes)?;
        }
        let hex: Vec<String> = chunk.bytes.iter().map(|b| format!("{b:02X}")).collect();
        println!("[{}] {}", clock_millis(chunk.timestamp), hex.join(" "));

        for msg in pipeline.ingest(&chunk.bytes) {
            stats.record(&msg);
        }
    }
    reader.stop.store(true, Ordering::Relaxed);
    drop(reader.chunks);
    let _ = reader.handle.join();

    if let Some(mut file) = out {
        file.flush()?;
    }
    println!("{}", "=".repeat(70));
    print!("{}", stats.render());
    Ok(())
}
