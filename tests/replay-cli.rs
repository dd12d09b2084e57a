use std::path::Path;

use assert_cmd::{assert::Assert, Command};
use predicates::prelude::*;
use serde_json::Value;

const SYN: u8 = 0xAA;

// B509 room 20.0°C, B511 type 1 flow 45.0 / return 40.0 / tank 64.0,
// B511 type 0 pressure 1.4 flame on, and one unknown broadcast from another master
const FRAMES: [&str; 4] = [
    "10 FE B5 09 02 28 00 82",
    "10 08 B5 11 01 01 89 00 06 5A 50 FF FF FF 80 83 00",
    "10 08 B5 11 01 00 12 00 08 00 00 0E 00 00 00 00 01 C1 00",
    "03 FE B5 77 01 01 65",
];
const LOW_PRESSURE: &str = "10 08 B5 11 01 00 12 00 08 00 00 06 00 00 00 00 01 DE 00";

fn capture_bytes(frames: &[&str]) -> Vec<u8> {
    let mut bytes = vec![SYN, SYN];
    for frame in frames {
        bytes.extend(hex::decode(frame.replace(' ', "")).unwrap());
        bytes.push(SYN);
    }
    bytes
}

fn replay_assert(file: &Path, json: bool) -> Assert {
    let mut cmd = Command::cargo_bin("ebb").unwrap();
    cmd.arg("replay").arg(file);
    if json {
        cmd.arg("--json");
    }
    cmd.assert()
}

#[test]
fn replay_reports_sensors_and_traffic() {
    let tempdir = tempfile::tempdir().unwrap();
    let file = tempdir.path().join("capture.bin");
    std::fs::write(&file, capture_bytes(&FRAMES)).unwrap();

    replay_assert(&file, false)
        .success()
        .stdout(predicate::str::contains("Total telegrams: 4"))
        .stdout(predicate::str::contains("0x10 (mipro): 3"))
        .stdout(predicate::str::contains("status_temps: 2"))
        .stdout(predicate::str::contains("flow_temperature"))
        .stdout(predicate::str::contains("45.0°C"))
        .stdout(predicate::str::contains("1.4bar"))
        .stdout(predicate::str::contains("No active alerts."));
}

#[test]
fn replay_json_snapshot() {
    let tempdir = tempfile::tempdir().unwrap();
    let file = tempdir.path().join("capture.bin");
    // No trailing SYN: the final segment must still be decoded
    let mut bytes = capture_bytes(&FRAMES);
    bytes.pop();
    std::fs::write(&file, bytes).unwrap();

    let assert = replay_assert(&file, true).success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let sensors: Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(sensors["boiler.flow_temperature"]["value"], 45.0);
    assert_eq!(sensors["boiler.return_temperature"]["value"], 40.0);
    assert_eq!(sensors["boiler.delta_t"]["value"], 5.0);
    assert_eq!(sensors["boiler.dhw_tank_temperature"]["value"], 64.0);
    assert_eq!(sensors["boiler.water_pressure"]["value"], 1.4);
    assert_eq!(sensors["boiler.water_pressure"]["unit"], "bar");
    assert_eq!(sensors["boiler.flame_on"]["value"], true);
    assert_eq!(sensors["mipro.room_temperature"]["value"], 20.0);
    assert!(sensors.get("boiler.storage_temperature_aux").is_none());
}

#[test]
fn replay_raises_alerts() {
    let tempdir = tempfile::tempdir().unwrap();
    let file = tempdir.path().join("capture.bin");
    std::fs::write(&file, capture_bytes(&[LOW_PRESSURE])).unwrap();

    replay_assert(&file, false)
        .success()
        .stdout(predicate::str::contains("ACTIVE ALERTS (1)"))
        .stdout(predicate::str::contains("[CRITICAL] Low water pressure"));
}

#[test]
fn replay_missing_file_fails() {
    let tempdir = tempfile::tempdir().unwrap();
    replay_assert(&tempdir.path().join("nope.bin"), false)
        .failure()
        .stderr(predicate::str::contains("Could not read capture file"));
}
