use serde::{Deserialize, Serialize};
use ulid::Ulid;

pub mod protocol;

pub use protocol::{
    CodeRegistry, DecodeOutcome, DecodeWarning, Decoder, FrameReport, MessageKind, Packet,
    decode_frame,
};

/// Unique identifier for a decoded reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadingId(pub Ulid);

/// A typed event decoded from a single bus packet.
///
/// Produced once per accepted packet and handed straight to a sink; the
/// decoder keeps no history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainEvent {
    /// Cabin temperature in degrees Celsius, 1/9 K resolution.
    Temperature { actual: f64, setpoint: f64 },
    /// State bits reported between an on/off command and its acknowledge.
    HeaterState {
        ready: bool,
        light: bool,
        heater: bool,
    },
    /// Total operating time of the heater, counting up.
    OperatingMinutes(u32),
    /// Remaining time of the selected bathing period, counting down.
    RemainingMinutes(u32),
    /// State bits sent after an on/off acknowledge.
    ///
    /// Only produced by the experimental registry.
    StateAcknowledge { light: bool, heater: bool },
    /// Acknowledge of a toggle command.
    ///
    /// Only produced by the experimental registry.
    CommandAcknowledge(AckCommand),
    /// A control-direction packet without a registered rule.
    RawUnknown {
        address: u8,
        kind: MessageKind,
        code: Option<u16>,
        data: Option<u32>,
    },
}

/// Command echoed by the control unit in a `0x7000` acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckCommand {
    None,
    HeaterToggle,
    LightToggle,
    Other(u32),
}

impl From<u32> for AckCommand {
    fn from(value: u32) -> Self {
        match value {
            0 => AckCommand::None,
            1 => AckCommand::HeaterToggle,
            2 => AckCommand::LightToggle,
            other => AckCommand::Other(other),
        }
    }
}

/// A decoded event together with when its frame arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unique id for this reading.
    pub id: ReadingId,
    /// Time the source frame was read off the bus.
    pub received_at: jiff::Timestamp,
    /// The decoded event.
    pub event: DomainEvent,
}

impl Reading {
    pub fn new(event: DomainEvent, received_at: jiff::Timestamp) -> Self {
        Self {
            id: ReadingId(Ulid::new()),
            received_at,
            event,
        }
    }
}
