//! Byte stuffing of the SYN and escape symbols inside a telegram

pub const SYN: u8 = 0xAA;
pub const ESC: u8 = 0xA9;
const ESC_ESC: u8 = 0x00;
const ESC_SYN: u8 = 0x01;

/// Reverse the eBUS byte stuffing.
///
/// An escape byte followed by anything other than 0x00/0x01 is kept verbatim
/// and the following byte is processed normally, as is a trailing escape byte.
pub fn unescape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == ESC && i + 1 < data.len() {
            match data[i + 1] {
                ESC_ESC => out.push(ESC),
                ESC_SYN => out.push(SYN),
                _ => {
                    out.push(ESC);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        match byte {
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            SYN => out.extend_from_slice(&[ESC, ESC_SYN]),
            _ => out.push(byte),
        }
    }
    out
}
