mod checksum;
mod decoder;
mod error;
mod frame;
mod packet;
mod registry;

pub use checksum::{CRC_16_TYLO, append_crc, crc16, is_valid};
pub use decoder::{DecodeOutcome, Decoder, FrameReport, decode_frame};
pub use error::DecodeWarning;
pub use frame::{Unstuffed, encode_frame, escape_literal, escape_selector, stuff, unstuff};
pub use packet::{BusMessage, MessageKind, Packet};
pub use registry::{
    CODE_COMMAND_ACK, CODE_HEATER_STATE, CODE_OPERATING_MINUTES, CODE_REMAINING_MINUTES,
    CODE_STATE_ACK, CODE_TEMPERATURE, CodeRegistry, CodeRule, DecodeFn, EXPERIMENTAL_RULES,
    STANDARD_RULES, TEMPERATURE_STEPS_PER_KELVIN, field, flag,
};

// frame structure : start(1) + stuffed(address(1) + kind(1) + [code(2) + [data(4)]] + crc(2)) + end(1)

pub const FRAME_START: u8 = 0x98;
pub const FRAME_END: u8 = 0x9C;
pub const FRAME_ESCAPE: u8 = 0x91;

pub const CRC_SIZE: usize = 2;
pub const DATA_SIZE: usize = 4;
/// Packets up to this length (CRC stripped) are bus keepalives.
pub const KEEPALIVE_MAX_LEN: usize = 2;

/// Lowercase hex dump, matching how captures are written down.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
