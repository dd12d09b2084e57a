use assert_cmd::{assert::Assert, Command};
use predicates::prelude::*;
use serde_json::Value;

const ROOM_TEMP: &str = "10 FE B5 09 02 28 00 82";
const ROOM_TEMP_BAD_CRC: &str = "10 FE B5 09 02 28 00 83";
const STATUS_EXTENDED: &str = "10 08 B5 11 01 00 12 00 08 00 00 0E 00 00 00 00 01 C1 00";

fn decode_assert(args: &[&str]) -> Assert {
    let mut cmd = Command::cargo_bin("ebb").unwrap();
    cmd.arg("decode").args(args).assert()
}

#[test]
fn decode_broadcast() {
    decode_assert(&[ROOM_TEMP])
        .success()
        .stdout(predicate::str::contains(
            "Telegram[ok](src=0x10, dst=0xFE, cmd=B509, len=2, data=2800)",
        ))
        .stdout(predicate::str::contains(
            "room_temp [mipro->broadcast]: room_setpoint_adjust=0, room_temp=20.0°C",
        ));
}

#[test]
fn decode_flags_bad_crc() {
    decode_assert(&[ROOM_TEMP_BAD_CRC])
        .success()
        .stdout(predicate::str::contains("Telegram[bad]"));
}

#[test]
fn decode_master_slave_as_json() {
    let assert = decode_assert(&["--json", STATUS_EXTENDED]).success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let msg: Value = serde_json::from_str(stdout.trim()).unwrap();

    assert_eq!(msg["name"], "status_temps");
    assert_eq!(msg["command"], "B511");
    assert_eq!(msg["source_name"], "mipro");
    assert_eq!(msg["dest_name"], "boiler");
    assert_eq!(msg["valid"], true);
    assert_eq!(msg["query_data"]["query_type"], 0);
    assert_eq!(msg["response_data"]["byte2"], 14);
}

#[test]
fn decode_json_output_is_only_json() {
    let assert = decode_assert(&["--json", &format!("{ROOM_TEMP} AA {ROOM_TEMP}")])
        .success()
        .stdout(predicate::str::contains("Telegram[").not());
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let msg: Value = serde_json::from_str(line).unwrap();
        assert_eq!(msg["name"], "room_temp");
    }
}

#[test]
fn decode_rejects_invalid_hex() {
    decode_assert(&["zz"])
        .failure()
        .stderr(predicate::str::contains("Invalid hex input"));
}

#[test]
fn decode_without_complete_telegram_fails() {
    decode_assert(&["10 FE B5"])
        .failure()
        .stderr(predicate::str::contains("No telegram found in input"));
}

#[test]
fn messages_lists_registry() {
    let mut cmd = Command::cargo_bin("ebb").unwrap();
    cmd.arg("messages")
        .assert()
        .success()
        .stdout(predicate::str::contains("B509  room_temp"))
        .stdout(predicate::str::contains("query:    room_temp [°C], room_setpoint_adjust"))
        .stdout(predicate::str::contains("0704  device_id"));
}

#[test]
fn unknown_subcommand_fails() {
    let mut cmd = Command::cargo_bin("ebb").unwrap();
    cmd.arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Subcommand must be one of"));
}
