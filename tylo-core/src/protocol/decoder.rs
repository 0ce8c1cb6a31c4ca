use std::sync::LazyLock;

use super::{
    BusMessage, CRC_SIZE, CodeRegistry, DecodeWarning, Packet, Unstuffed, crc16, is_valid, to_hex,
    unstuff,
};
use crate::DomainEvent;

/// What became of one raw frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// The payload failed the CRC check and was discarded.
    CrcMismatch { residue: u16, raw_hex: String },
    /// A two-byte liveness packet.
    KeepAlive,
    /// A valid packet whose direction is not decoded into events.
    Filtered(Packet),
    Event(DomainEvent),
}

/// Outcome of decoding a frame plus any anomalies met on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub outcome: DecodeOutcome,
    pub warnings: Vec<DecodeWarning>,
    /// Name of the registry rule that produced the event, if one matched.
    pub rule: Option<&'static str>,
}

impl FrameReport {
    pub fn event(&self) -> Option<&DomainEvent> {
        match &self.outcome {
            DecodeOutcome::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<DomainEvent> {
        match self.outcome {
            DecodeOutcome::Event(event) => Some(event),
            _ => None,
        }
    }
}

/// Runs a raw frame through unstuffing, the CRC gate, packet parsing and
/// the code registry.
///
/// Holds no mutable state, so one decoder can be shared across tasks.
#[derive(Debug, Clone)]
pub struct Decoder {
    registry: CodeRegistry,
}

impl Decoder {
    pub fn new(registry: CodeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CodeRegistry {
        &self.registry
    }

    /// Decode one delimited frame (start marker first, end marker last).
    pub fn decode_frame(&self, raw: &[u8]) -> FrameReport {
        let Unstuffed {
            payload,
            mut warnings,
        } = unstuff(raw);

        if !is_valid(&payload) {
            return FrameReport {
                outcome: DecodeOutcome::CrcMismatch {
                    residue: crc16(&payload),
                    raw_hex: to_hex(raw),
                },
                warnings,
                rule: None,
            };
        }

        let body = &payload[..payload.len() - CRC_SIZE];
        let (outcome, rule) = match BusMessage::from_bytes(body, &mut warnings) {
            BusMessage::KeepAlive => (DecodeOutcome::KeepAlive, None),
            BusMessage::Packet(packet) => match self.interpret_with_rule(&packet) {
                Some((event, rule)) => (DecodeOutcome::Event(event), rule),
                None => (DecodeOutcome::Filtered(packet), None),
            },
        };

        FrameReport {
            outcome,
            warnings,
            rule,
        }
    }

    /// Map a packet to an event.
    ///
    /// Returns `None` for packets not travelling from the control unit to
    /// the heater. Codes without a rule, and packets without a code, become
    /// [`DomainEvent::RawUnknown`]. A registered code without a data word is
    /// decoded as if the data were zero.
    pub fn interpret(&self, packet: &Packet) -> Option<DomainEvent> {
        self.interpret_with_rule(packet).map(|(event, _)| event)
    }

    fn interpret_with_rule(
        &self,
        packet: &Packet,
    ) -> Option<(DomainEvent, Option<&'static str>)> {
        if !packet.kind.is_control_to_heater() {
            return None;
        }

        let decoded = match packet.code.and_then(|code| self.registry.get(code)) {
            Some(rule) => ((rule.decode)(packet.data.unwrap_or(0)), Some(rule.name)),
            None => (
                DomainEvent::RawUnknown {
                    address: packet.address,
                    kind: packet.kind,
                    code: packet.code,
                    data: packet.data,
                },
                None,
            ),
        };

        Some(decoded)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(CodeRegistry::standard())
    }
}

static STANDARD_DECODER: LazyLock<Decoder> = LazyLock::new(Decoder::default);

/// Decode a frame with the standard registry.
pub fn decode_frame(raw: &[u8]) -> FrameReport {
    STANDARD_DECODER.decode_frame(raw)
}
