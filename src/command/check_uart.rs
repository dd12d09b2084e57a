use anyhow::{anyhow, Result};

use crate::argsets::CheckUartArgs;
use crate::config::SerialConfig;
use crate::interfaces::serial::{loopback_check, LoopbackResult};

/// Loopback test; TX must be bridged to RX while it runs
pub fn check_uart(args: CheckUartArgs) -> Result<()> {
    let device = match args.device {
        Some(device) => device,
        None => SerialConfig::from_env()?.device,
    };
    println!("Starting loopback test on {device}");

    match loopback_check(&device)? {
        LoopbackResult::Success => {
            println!("SUCCESS: data looped back");
            Ok(())
        }
        LoopbackResult::Partial(received) => Err(anyhow!(
            "PARTIAL: received '{received}', check baud rate and wiring"
        )),
        LoopbackResult::Nothing => Err(anyhow!("FAIL: received nothing, the signal is lost")),
    }
}
