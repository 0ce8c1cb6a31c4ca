use crc::{Algorithm, Crc};

use super::CRC_SIZE;

/// CRC used on the heater bus.
///
/// Width 16, polynomial 0x90D9, init 0xFFFF, no reflection and no final XOR.
/// None of the catalogued CRC-16 variants share this polynomial, so it is
/// spelled out here. The check value is the CRC of `b"123456789"`.
pub const CRC_16_TYLO: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x90d9,
    init: 0xffff,
    refin: false,
    refout: false,
    xorout: 0x0000,
    check: 0x3778,
    residue: 0x0000,
};

const BUS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_TYLO);

/// Compute the bus CRC over `bytes`.
///
/// Run over a payload that still carries its two trailing CRC bytes, the
/// result is the residue, which is zero for an intact payload.
pub fn crc16(bytes: &[u8]) -> u16 {
    BUS_CRC.checksum(bytes)
}

/// Whether `payload` (including its trailing CRC) has a zero residue.
pub fn is_valid(payload: &[u8]) -> bool {
    payload.len() >= CRC_SIZE && crc16(payload) == 0
}

/// Copy `payload` and append its CRC, big-endian.
pub fn append_crc(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + CRC_SIZE);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc16(payload).to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(crc16(b"123456789"), CRC_16_TYLO.check);
    }

    #[test]
    fn empty_input_is_init() {
        assert_eq!(crc16(&[]), 0xffff);
        assert!(!is_valid(&[]));
    }

    #[test]
    fn known_packets() {
        assert_eq!(crc16(&[0x40, 0x06]), 0x6d3a);
        assert_eq!(crc16(&[0x40, 0x07]), 0xfde3);
        assert_eq!(
            crc16(&[0x40, 0x07, 0x60, 0x00, 0x00, 0x16, 0x38, 0xab]),
            0x1f17
        );
    }

    #[test]
    fn appended_crc_leaves_zero_residue() {
        for payload in [
            &[][..],
            &[0x00][..],
            &[0x40, 0x09, 0x94, 0x01, 0x00, 0x00, 0x00, 0xb2][..],
            &[0x98, 0x9c, 0x91, 0xff][..],
        ] {
            let with_crc = append_crc(payload);
            assert_eq!(with_crc.len(), payload.len() + CRC_SIZE);
            assert_eq!(crc16(&with_crc), 0);
            assert!(is_valid(&with_crc));
        }
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut with_crc = append_crc(&[0x40, 0x09, 0x34, 0x00, 0x00, 0x00, 0x00, 0x19]);
        with_crc[3] ^= 0x01;
        assert_ne!(crc16(&with_crc), 0);
        assert!(!is_valid(&with_crc));
    }

    #[test]
    fn deterministic() {
        let bytes = [0x7f, 0x00, 0x34, 0x0a];
        assert_eq!(crc16(&bytes), crc16(&bytes));
        assert_eq!(crc16(&bytes), 0x0c12);
    }
}
