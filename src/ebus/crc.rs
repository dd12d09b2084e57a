//! CRC-8 used by eBUS, polynomial 0x9B (x^8 + x^7 + x^4 + x^3 + x + 1), initial value 0.

pub const POLYNOMIAL: u8 = 0x9B;

static TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut crc = byte as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[byte] = crc;
        byte += 1;
    }
    table
}

pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &byte| TABLE[(crc ^ byte) as usize])
}

/// Bit-by-bit variant of [`crc8`]
pub fn crc8_bitwise(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

pub fn verify(data: &[u8], expected: u8) -> bool {
    crc8(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_yields_polynomial() {
        assert_eq!(crc8(&[0x01]), POLYNOMIAL);
        assert_eq!(crc8(&[]), 0);
        assert_eq!(crc8(&[0x00, 0x00]), 0);
    }

    #[test]
    fn table_matches_bitwise() {
        let samples: [&[u8]; 4] = [
            &[0x10, 0x08, 0xB5, 0x11, 0x01, 0x01],
            &[0x10, 0xFE, 0xB5, 0x16, 0x08, 0x00, 0x30, 0x15, 0x14, 0x21, 0x11, 0x02, 0x24],
            &[0xFF; 32],
            &[0xA9, 0xAA, 0x00],
        ];
        for data in samples {
            assert_eq!(crc8(data), crc8_bitwise(data), "data: {}", hex::encode(data));
        }
        for byte in 0..=255u8 {
            assert_eq!(crc8(&[byte]), crc8_bitwise(&[byte]));
        }
    }

    #[test]
    fn verify_detects_corruption() {
        let data = [0x10, 0x08, 0xB5, 0x11, 0x01, 0x01];
        let crc = crc8(&data);
        assert!(verify(&data, crc));
        assert!(!verify(&data, crc.wrapping_add(1)));
    }
}
