use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use env_logger::Env;

use ebus_bridge::argsets::{
    CaptureArgs, CheckUartArgs, DecodeArgs, ListenArgs, ReplayArgs, RunArgs, SensorsArgs,
};
use ebus_bridge::command;
use ebus_bridge::constants::{defaults, envvars};
use ebus_bridge::helpers::load_dotenv;

const CMD_RUN: &str = "run";
const CMD_LISTEN: &str = "listen";
const CMD_CAPTURE: &str = "capture";
const CMD_DECODE: &str = "decode";
const CMD_REPLAY: &str = "replay";
const CMD_MESSAGES: &str = "messages";
const CMD_SENSORS: &str = "sensors";
const CMD_CHECK_UART: &str = "check-uart";

const DEFAULT_CAPTURE_SECS: u64 = 60;

const USAGE: &str = "\
Usage: ebb <command> [options]

Commands:
  run [--device PATH] [--mqtt-host HOST] [--mqtt-port PORT] [--json]
  listen [--device PATH]
  capture [--device PATH] [--duration SECS] [--output FILE]
  decode <HEX> [--json]
  replay <FILE> [--json]
  messages
  sensors [--json]
  check-uart [--device PATH]";

fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(
        Env::default().filter_or(envvars::LOG_LEVEL, defaults::LOG_LEVEL),
    )
    .init();

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        println!("{USAGE}");
        return Ok(());
    }

    let res = match args.subcommand()?.as_deref() {
        Some(CMD_RUN) => command::run_bridge(RunArgs {
            device: args.opt_value_from_str("--device")?,
            mqtt_host: args.opt_value_from_str("--mqtt-host")?,
            mqtt_port: args.opt_value_from_str("--mqtt-port")?,
            json: args.contains("--json"),
        }),
        Some(CMD_LISTEN) => command::listen(ListenArgs {
            device: args.opt_value_from_str("--device")?,
        }),
        Some(CMD_CAPTURE) => command::capture(CaptureArgs {
            device: args.opt_value_from_str("--device")?,
            duration: Duration::from_secs(
                args.opt_value_from_str("--duration")?
                    .unwrap_or(DEFAULT_CAPTURE_SECS),
            ),
            output: args.opt_value_from_str::<_, PathBuf>("--output")?,
        }),
        Some(CMD_DECODE) => {
            let json = args.contains("--json");
            command::decode(DecodeArgs {
                hex: args.free_from_str()?,
                json,
            })
        }
        Some(CMD_REPLAY) => {
            let json = args.contains("--json");
            command::replay(ReplayArgs {
                file: args.free_from_str()?,
                json,
            })
        }
        Some(CMD_MESSAGES) => command::messages(),
        Some(CMD_SENSORS) => command::sensors(SensorsArgs {
            json: args.contains("--json"),
        }),
        Some(CMD_CHECK_UART) => command::check_uart(CheckUartArgs {
            device: args.opt_value_from_str("--device")?,
        }),
        _ => Err(anyhow!(
            "Subcommand must be one of 'run', 'listen', 'capture', 'decode', 'replay', 'messages', 'sensors', 'check-uart'\n\n{USAGE}"
        )),
    };

    let remaining = args.finish();
    if !remaining.is_empty() {
        log::warn!("Ignored unexpected arguments: {remaining:?}");
    }
    res
}
