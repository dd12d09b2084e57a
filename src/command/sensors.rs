use anyhow::{anyhow, Result};

use crate::argsets::SensorsArgs;
use crate::data_mgmt::last_sensor_cache;
use crate::thelia::{aggregator, alerts};

/// Show the snapshot the bridge last published
pub fn sensors(args: SensorsArgs) -> Result<()> {
    let cache = last_sensor_cache::open_cache()?;
    let (timestamp, sensors) = last_sensor_cache::load_last_sensors(&cache)?
        .ok_or_else(|| anyhow!("No sensor snapshot cached yet"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sensors)?);
        return Ok(());
    }

    let active = last_sensor_cache::load_active_alerts(&cache)?;
    println!("Snapshot from {}", timestamp.to_rfc3339());
    print!("{}", aggregator::render_status(&sensors));
    print!("{}", alerts::render_status(&active.iter().collect::<Vec<_>>()));
    Ok(())
}
