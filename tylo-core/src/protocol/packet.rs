use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DATA_SIZE, DecodeWarning, KEEPALIVE_MAX_LEN};

// packet structure : address(1) + kind(1) + [code(2) + [data(4)]]

/// Second byte of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Heater to control unit.
    Request,
    /// Control unit to heater.
    Command,
    /// Heater to control unit.
    DataFromHeater,
    /// Control unit to heater, usually acknowledging a `DataFromHeater`.
    DataFromControl,
    /// Seen on the bus, meaning unknown.
    Unknown,
    Other(u8),
}

impl MessageKind {
    /// Whether packets of this kind travel from the control unit to the
    /// heater. Only those are decoded into events.
    pub fn is_control_to_heater(self) -> bool {
        matches!(self, MessageKind::Command | MessageKind::DataFromControl)
    }
}

impl From<u8> for MessageKind {
    fn from(value: u8) -> Self {
        match value {
            0x06 => MessageKind::Request,
            0x07 => MessageKind::Command,
            0x08 => MessageKind::DataFromHeater,
            0x09 => MessageKind::DataFromControl,
            0x0A => MessageKind::Unknown,
            other => MessageKind::Other(other),
        }
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Request => 0x06,
            MessageKind::Command => 0x07,
            MessageKind::DataFromHeater => 0x08,
            MessageKind::DataFromControl => 0x09,
            MessageKind::Unknown => 0x0A,
            MessageKind::Other(raw) => raw,
        }
    }
}

/// A CRC-checked packet with the CRC removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub address: u8,
    pub kind: MessageKind,
    /// Present when the packet is longer than three bytes.
    pub code: Option<u16>,
    /// Present when the packet is longer than four bytes.
    pub data: Option<u32>,
}

/// What a verified payload turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMessage {
    /// Two bytes or fewer; carries nothing but bus liveness.
    KeepAlive,
    Packet(Packet),
}

impl BusMessage {
    /// Split a payload (CRC already stripped) into its fields.
    ///
    /// The data field is read big-endian from offset 4 to the end. A shorter
    /// field is zero-extended; a longer one is cut to its first four bytes and
    /// a [`DecodeWarning::DataTooLong`] is pushed onto `warnings`.
    pub fn from_bytes(bytes: &[u8], warnings: &mut Vec<DecodeWarning>) -> Self {
        if bytes.len() <= KEEPALIVE_MAX_LEN {
            return BusMessage::KeepAlive;
        }

        let code = (bytes.len() > 3).then(|| u16::from_be_bytes([bytes[2], bytes[3]]));

        let data = (bytes.len() > 4).then(|| {
            let field = &bytes[4..];
            if field.len() > DATA_SIZE {
                warnings.push(DecodeWarning::DataTooLong { len: field.len() });
            }
            field
                .iter()
                .take(DATA_SIZE)
                .fold(0u32, |acc, &byte| (acc << 8) | u32::from(byte))
        });

        BusMessage::Packet(Packet {
            address: bytes[0],
            kind: MessageKind::from(bytes[1]),
            code,
            data,
        })
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x} {:02x}", self.address, u8::from(self.kind))?;
        if let Some(code) = self.code {
            write!(f, " {code:04x}")?;
        }
        if let Some(data) = self.data {
            write!(f, " {data:08x}")?;
        }
        Ok(())
    }
}
