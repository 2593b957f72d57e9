//! Node configuration checksum
//!
//! Nodes report the CRC-16/CCITT-FALSE of their configuration image in their
//! identity frame and in `DATA_CONFIG_CRC`; the master sends the same value
//! with `NODE_COMMIT_CFG` / `CFG_WRITE_NVS`.

/// CRC of a node whose configuration storage was never written
pub const EMPTY_CONFIG_CRC: u16 = 0xFFFF;

const POLY: u16 = 0x1021;
const INIT: u16 = 0xFFFF;

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, MSB first, no final xor)
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    data.iter().fold(INIT, |crc, &byte| {
        (0..8).fold(crc ^ ((byte as u16) << 8), |crc, _| {
            if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_is_init() {
        assert_eq!(crc16_ccitt(&[]), EMPTY_CONFIG_CRC);
    }

    #[test]
    fn test_single_bit_changes_crc() {
        let image = [0u8; 136];
        let mut flipped = image;
        flipped[135] ^= 0x01;
        assert_ne!(crc16_ccitt(&image), crc16_ccitt(&flipped));
    }
}
