//! Byte stuffing for the bus framing layer.
//!
//! ```text
//! +------+---------------------------------+------+
//! | 0x98 | stuffed(packet + crc_hi crc_lo) | 0x9C |
//! +------+---------------------------------+------+
//! ```
//!
//! Inside a frame every occurrence of a marker or of the escape byte is
//! replaced by `0x91` followed by a selector:
//!
//! | literal | selector |
//! |---------|----------|
//! | `0x9C`  | `0x63`   |
//! | `0x98`  | `0x67`   |
//! | `0x91`  | `0x6E`   |

use super::{DecodeWarning, FRAME_END, FRAME_ESCAPE, FRAME_START, append_crc};

const SELECTOR_END: u8 = 0x63;
const SELECTOR_START: u8 = 0x67;
const SELECTOR_ESCAPE: u8 = 0x6E;

/// Literal byte an escape selector stands for.
pub fn escape_literal(selector: u8) -> Option<u8> {
    match selector {
        SELECTOR_END => Some(FRAME_END),
        SELECTOR_START => Some(FRAME_START),
        SELECTOR_ESCAPE => Some(FRAME_ESCAPE),
        _ => None,
    }
}

/// Selector used to escape `byte`, if it needs escaping.
pub fn escape_selector(byte: u8) -> Option<u8> {
    match byte {
        FRAME_END => Some(SELECTOR_END),
        FRAME_START => Some(SELECTOR_START),
        FRAME_ESCAPE => Some(SELECTOR_ESCAPE),
        _ => None,
    }
}

/// Payload recovered from a raw frame, CRC still attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unstuffed {
    pub payload: Vec<u8>,
    pub warnings: Vec<DecodeWarning>,
}

/// Remove the markers and escape sequences from a delimited frame.
///
/// The first and last byte are taken to be the start and end markers and are
/// skipped without being checked. An unknown selector is kept verbatim,
/// preceded by the escape byte, and reported as a warning. This never fails.
pub fn unstuff(frame: &[u8]) -> Unstuffed {
    let interior = match frame.len() {
        0..=2 => &[][..],
        len => &frame[1..len - 1],
    };

    let mut payload = Vec::with_capacity(interior.len());
    let mut warnings = Vec::new();
    let mut escaped = false;

    for (index, &byte) in interior.iter().enumerate() {
        if byte == FRAME_ESCAPE && !escaped {
            escaped = true;
            continue;
        }

        if escaped {
            escaped = false;
            match escape_literal(byte) {
                Some(literal) => payload.push(literal),
                None => {
                    warnings.push(DecodeWarning::EscapeAnomaly {
                        selector: byte,
                        // +1 for the start marker
                        offset: index + 1,
                    });
                    payload.push(FRAME_ESCAPE);
                    payload.push(byte);
                }
            }
            continue;
        }

        payload.push(byte);
    }

    Unstuffed { payload, warnings }
}

/// Escape every marker and escape byte in `payload`.
pub fn stuff(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    for &byte in payload {
        match escape_selector(byte) {
            Some(selector) => {
                out.push(FRAME_ESCAPE);
                out.push(selector);
            }
            None => out.push(byte),
        }
    }
    out
}

/// Build a complete frame: markers, stuffed packet and its CRC.
///
/// Used to produce captures and test vectors; nothing writes to the bus.
pub fn encode_frame(packet: &[u8]) -> Vec<u8> {
    let stuffed = stuff(&append_crc(packet));
    let mut out = Vec::with_capacity(stuffed.len() + 2);
    out.push(FRAME_START);
    out.extend_from_slice(&stuffed);
    out.push(FRAME_END);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(interior: &[u8]) -> Vec<u8> {
        let mut out = vec![FRAME_START];
        out.extend_from_slice(interior);
        out.push(FRAME_END);
        out
    }

    #[test]
    fn plain_bytes_pass_through() {
        let unstuffed = unstuff(&framed(&[0x40, 0x07, 0xfd, 0xe3]));
        assert_eq!(unstuffed.payload, vec![0x40, 0x07, 0xfd, 0xe3]);
        assert!(unstuffed.warnings.is_empty());
    }

    #[test]
    fn known_selectors() {
        let unstuffed = unstuff(&framed(&[0x91, 0x63, 0x91, 0x67, 0x91, 0x6e, 0x01]));
        assert_eq!(unstuffed.payload, vec![0x9c, 0x98, 0x91, 0x01]);
        assert!(unstuffed.warnings.is_empty());
    }

    #[test]
    fn unknown_selector_is_kept_and_reported() {
        let unstuffed = unstuff(&framed(&[0x40, 0x91, 0x55, 0x09]));
        assert_eq!(unstuffed.payload, vec![0x40, 0x91, 0x55, 0x09]);
        assert_eq!(
            unstuffed.warnings,
            vec![DecodeWarning::EscapeAnomaly {
                selector: 0x55,
                offset: 3
            }]
        );
    }

    #[test]
    fn double_escape_is_an_anomaly() {
        let unstuffed = unstuff(&framed(&[0x91, 0x91, 0x02]));
        assert_eq!(unstuffed.payload, vec![0x91, 0x91, 0x02]);
        assert_eq!(unstuffed.warnings.len(), 1);
    }

    #[test]
    fn trailing_escape_is_dropped() {
        let unstuffed = unstuff(&framed(&[0x40, 0x06, 0x91]));
        assert_eq!(unstuffed.payload, vec![0x40, 0x06]);
        assert!(unstuffed.warnings.is_empty());
    }

    #[test]
    fn markers_are_never_payload() {
        assert!(unstuff(&[]).payload.is_empty());
        assert!(unstuff(&[FRAME_START]).payload.is_empty());
        assert!(unstuff(&[FRAME_START, FRAME_END]).payload.is_empty());
        assert_eq!(unstuff(&[0x00, 0x42, 0x00]).payload, vec![0x42]);
    }

    #[test]
    fn stuff_then_unstuff_restores_every_byte() {
        let payload: Vec<u8> = (0..=255).collect();
        let stuffed = stuff(&payload);
        assert_eq!(stuffed.len(), payload.len() + 3);
        assert!(!stuffed.contains(&FRAME_START));
        assert!(!stuffed.contains(&FRAME_END));

        let unstuffed = unstuff(&framed(&stuffed));
        assert_eq!(unstuffed.payload, payload);
        assert!(unstuffed.warnings.is_empty());
    }

    #[test]
    fn encode_known_frame() {
        let frame = encode_frame(&[0x40, 0x07, 0x60, 0x00, 0x00, 0x16, 0x38, 0xab]);
        assert_eq!(
            frame,
            vec![
                0x98, 0x40, 0x07, 0x60, 0x00, 0x00, 0x16, 0x38, 0xab, 0x1f, 0x17, 0x9c
            ]
        );
    }

    #[test]
    fn encode_escapes_crc_bytes_too() {
        let frame = encode_frame(&[0x40, 0x09, 0x9c, 0x98]);
        assert_eq!(frame.first(), Some(&FRAME_START));
        assert_eq!(frame.last(), Some(&FRAME_END));
        assert!(!frame[1..frame.len() - 1].contains(&FRAME_END));
        assert!(!frame[1..frame.len() - 1].contains(&FRAME_START));

        let unstuffed = unstuff(&frame);
        assert_eq!(&unstuffed.payload[..4], &[0x40, 0x09, 0x9c, 0x98]);
    }
}
