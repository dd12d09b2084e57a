use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::Utc;
use flume::RecvTimeoutError;

use crate::argsets::ListenArgs;
use crate::config::Config;
use crate::helpers::clock_millis;
use crate::thelia::{aggregator, alerts, AlertManager};

use super::bus::{self, BusPipeline};
use super::POLL_INTERVAL;

/// Print decoded bus traffic to the console, with a status report every stats interval
pub fn listen(args: ListenArgs) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(device) = args.device {
        config.serial.device = device;
    }
    log::info!("Listening on {}", config.serial.device);

    let reader = bus::start_reader(&config.serial);
    let mut pipeline = BusPipeline::new(config.sensor_max_age);
    let mut alert_manager = AlertManager::new();
    let mut last_report = Instant::now();

    loop {
        match reader.chunks.recv_timeout(POLL_INTERVAL) {
            Ok(chunk) => {
                for msg in pipeline.ingest(&chunk.bytes) {
                    if msg.is_known() && msg.valid {
                        println!("[{}] {msg}", clock_millis(msg.timestamp));
                    } else {
                        log::debug!("{}", msg.telegram);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return Err(anyhow!("Serial reader stopped")),
        }

        if last_report.elapsed() >= config.stats_interval {
            let now = Utc::now();
            let sensors = pipeline.store.fresh_sensors(now);
            alert_manager.check_sensors(&sensors, now);
            alert_manager.check_staleness(&pipeline.store.all_sensors(now), now);

            print!("{}", aggregator::render_status(&sensors));
            print!("{}", alerts::render_status(&alert_manager.active_alerts()));
            pipeline.log_stats(sensors.len());
            last_report = Instant::now();
        }
    }
}
