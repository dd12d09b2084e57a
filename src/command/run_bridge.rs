use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::Utc;
use flume::RecvTimeoutError;
use kvstore::KVDb;

use crate::argsets::RunArgs;
use crate::config::Config;
use crate::data_mgmt::last_sensor_cache;
use crate::interfaces::mqtt::{MqttError, MqttPublisher};
use crate::thelia::{Alert, AlertLevel, AlertManager};

use super::bus::{self, BusPipeline};
use super::POLL_INTERVAL;

/// Undelivered alerts kept while the broker is unreachable
const MAX_PENDING_ALERTS: usize = 100;

/// Alerts waiting to reach the broker, oldest first
#[derive(Debug, Default)]
struct AlertOutbox {
    pending: VecDeque<Alert>,
}

impl AlertOutbox {
    fn push(&mut self, alert: Alert) {
        if self.pending.len() == MAX_PENDING_ALERTS {
            if let Some(dropped) = self.pending.pop_front() {
                log::warn!("Alert queue full, dropping undelivered alert: {dropped}");
            }
        }
        self.pending.push_back(alert);
    }

    /// Send queued alerts in order, stopping at the first one that cannot be delivered
    fn flush<F>(&mut self, mut send: F)
    where
        F: FnMut(&Alert) -> Result<bool, MqttError>,
    {
        while let Some(alert) = self.pending.front() {
            match send(alert) {
                Ok(true) => {
                    self.pending.pop_front();
                }
                Ok(false) => {
                    log::debug!("MQTT not connected, {} alerts queued", self.pending.len());
                    break;
                }
                Err(e) => {
                    log::error!("Failed to publish alert: {e}");
                    break;
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub fn run_bridge(args: RunArgs) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(device) = args.device {
        config.serial.device = device;
    }
    if let Some(host) = args.mqtt_host {
        config.mqtt.host = host;
    }
    if let Some(port) = args.mqtt_port {
        config.mqtt.port = port;
    }
    config.mqtt.json |= args.json;

    log::info!(
        "Starting eBUS bridge: {} -> mqtt://{}:{}/{}",
        config.serial.device,
        config.mqtt.host,
        config.mqtt.port,
        config.mqtt.base_topic
    );

    let cache = last_sensor_cache::open_cache()?;
    let publisher = MqttPublisher::connect(&config.mqtt);
    let reader = bus::start_reader(&config.serial);
    let mut pipeline = BusPipeline::new(config.sensor_max_age);
    let mut alerts = AlertManager::new();
    let mut outbox = AlertOutbox::default();

    let mut last_publish = Instant::now();
    let mut last_stats = Instant::now();

    let result: Result<()> = loop {
        match reader.chunks.recv_timeout(POLL_INTERVAL) {
            Ok(chunk) => {
                for msg in pipeline.ingest(&chunk.bytes) {
                    if msg.is_known() && msg.valid {
                        log::debug!("{msg}");
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => break Err(anyhow!("Serial reader stopped")),
        }

        if last_publish.elapsed() >= config.publish_interval {
            publish_cycle(&pipeline, &mut alerts, &mut outbox, &publisher, &cache);
            last_publish = Instant::now();
        }
        if last_stats.elapsed() >= config.stats_interval {
            let active = pipeline.store.fresh_sensors(Utc::now()).len();
            pipeline.log_stats(active);
            last_stats = Instant::now();
        }
    };

    if !outbox.is_empty() {
        log::warn!("{} alerts were never delivered", outbox.len());
    }
    reader.stop.store(true, Ordering::Relaxed);
    drop(reader.chunks);
    let _ = reader.handle.join();
    if let Err(e) = publisher.disconnect() {
        log::warn!("Could not disconnect from MQTT cleanly: {e}");
    }
    result
}

fn publish_cycle(
    pipeline: &BusPipeline,
    alerts: &mut AlertManager,
    outbox: &mut AlertOutbox,
    publisher: &MqttPublisher,
    cache: &KVDb,
) {
    let now = Utc::now();
    let sensors = pipeline.store.fresh_sensors(now);

    if !sensors.is_empty() {
        match publisher.publish_sensors(&sensors) {
            Ok(true) => log::debug!("Published {} sensors", sensors.len()),
            Ok(false) => log::warn!("MQTT not connected, skipping publish"),
            Err(e) => log::error!("Failed to publish sensors: {e}"),
        }
        if let Err(e) = last_sensor_cache::save_last_sensors(cache, &sensors, now) {
            log::warn!("Could not cache sensors: {e}");
        }
    }

    let mut raised = alerts.check_sensors(&sensors, now);
    raised.extend(alerts.check_staleness(&pipeline.store.all_sensors(now), now));
    for alert in raised {
        match alert.level {
            AlertLevel::Critical => log::error!("{alert}"),
            AlertLevel::Warning => log::warn!("{alert}"),
            AlertLevel::Info => log::info!("{alert}"),
        }
        outbox.push(alert);
    }
    outbox.flush(|alert| publisher.publish_alert(alert));
    if let Err(e) = last_sensor_cache::save_active_alerts(cache, &alerts.active_alerts()) {
        log::warn!("Could not cache alerts: {e}");
    }
}
