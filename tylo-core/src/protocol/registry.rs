//! Table of known codes and how to turn their data word into an event.
//!
//! Most of the code space seen on the bus is still unexplained. New codes are
//! added as [`CodeRule`] entries; the decoder looks rules up by code and never
//! needs to change.
//!
//! Known data layouts:
//!
//! ```text
//! 6000  bits  0..10  measured temperature, 1/9 K steps
//!       bits 11..21  temperature setting,  1/9 K steps
//! 3400  bit 0 ready, bit 3 light, bit 4 heater
//! 9400  minute up counter (total operating time)
//! 9401  minute down counter (remaining bathing time)
//! 7000  acknowledged command: 1 heater toggle, 2 light toggle
//! 7180  bit 17 light, bits 14..16 heater
//! ```

use std::collections::BTreeMap;

use crate::{AckCommand, DomainEvent};

pub const CODE_TEMPERATURE: u16 = 0x6000;
pub const CODE_HEATER_STATE: u16 = 0x3400;
pub const CODE_OPERATING_MINUTES: u16 = 0x9400;
pub const CODE_REMAINING_MINUTES: u16 = 0x9401;
pub const CODE_COMMAND_ACK: u16 = 0x7000;
pub const CODE_STATE_ACK: u16 = 0x7180;

/// Temperatures are transmitted in ninths of a kelvin.
pub const TEMPERATURE_STEPS_PER_KELVIN: f64 = 9.0;
const TEMPERATURE_WIDTH: u32 = 11;

/// Turns the data word of a packet into an event.
pub type DecodeFn = fn(u32) -> DomainEvent;

#[derive(Debug, Clone, Copy)]
pub struct CodeRule {
    pub code: u16,
    /// Short name, reported with each event the rule decodes.
    pub name: &'static str,
    pub decode: DecodeFn,
}

/// Rules verified against bus captures.
pub const STANDARD_RULES: &[CodeRule] = &[
    CodeRule {
        code: CODE_TEMPERATURE,
        name: "temperature",
        decode: decode_temperature,
    },
    CodeRule {
        code: CODE_HEATER_STATE,
        name: "heater_state",
        decode: decode_heater_state,
    },
    CodeRule {
        code: CODE_OPERATING_MINUTES,
        name: "operating_minutes",
        decode: decode_operating_minutes,
    },
    CodeRule {
        code: CODE_REMAINING_MINUTES,
        name: "remaining_minutes",
        decode: decode_remaining_minutes,
    },
];

/// Rules taken from protocol notes that have not been checked against
/// traffic yet.
pub const EXPERIMENTAL_RULES: &[CodeRule] = &[
    CodeRule {
        code: CODE_COMMAND_ACK,
        name: "command_ack",
        decode: decode_command_ack,
    },
    CodeRule {
        code: CODE_STATE_ACK,
        name: "state_ack",
        decode: decode_state_ack,
    },
];

/// Read-only lookup from code to decoding rule.
#[derive(Debug, Clone, Default)]
pub struct CodeRegistry {
    rules: BTreeMap<u16, CodeRule>,
}

impl CodeRegistry {
    /// A registry with no rules; every code decodes as unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The verified rules only.
    pub fn standard() -> Self {
        Self::empty().with_rules(STANDARD_RULES)
    }

    /// The verified rules plus the unverified acknowledge codes.
    pub fn experimental() -> Self {
        Self::standard().with_rules(EXPERIMENTAL_RULES)
    }

    /// Add a rule, replacing any earlier rule for the same code.
    pub fn with_rule(mut self, code: u16, name: &'static str, decode: DecodeFn) -> Self {
        self.rules.insert(code, CodeRule { code, name, decode });
        self
    }

    pub fn with_rules(self, rules: &[CodeRule]) -> Self {
        rules.iter().fold(self, |registry, rule| {
            registry.with_rule(rule.code, rule.name, rule.decode)
        })
    }

    pub fn get(&self, code: u16) -> Option<&CodeRule> {
        self.rules.get(&code)
    }

    pub fn contains(&self, code: u16) -> bool {
        self.rules.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registered codes and their names, in code order.
    pub fn names(&self) -> impl Iterator<Item = (u16, &'static str)> + '_ {
        self.rules.values().map(|rule| (rule.code, rule.name))
    }
}

/// Extract `width` bits of `data` starting at bit `shift`.
pub fn field(data: u32, shift: u32, width: u32) -> u32 {
    let shifted = data.checked_shr(shift).unwrap_or(0);
    match width {
        0 => 0,
        w if w >= u32::BITS => shifted,
        w => shifted & ((1 << w) - 1),
    }
}

/// Whether bit `bit` of `data` is set.
pub fn flag(data: u32, bit: u32) -> bool {
    field(data, bit, 1) == 1
}

fn decode_temperature(data: u32) -> DomainEvent {
    let actual = field(data, 0, TEMPERATURE_WIDTH);
    let setpoint = field(data, TEMPERATURE_WIDTH, TEMPERATURE_WIDTH);
    DomainEvent::Temperature {
        actual: f64::from(actual) / TEMPERATURE_STEPS_PER_KELVIN,
        setpoint: f64::from(setpoint) / TEMPERATURE_STEPS_PER_KELVIN,
    }
}

fn decode_heater_state(data: u32) -> DomainEvent {
    DomainEvent::HeaterState {
        ready: flag(data, 0),
        light: flag(data, 3),
        heater: flag(data, 4),
    }
}

fn decode_operating_minutes(data: u32) -> DomainEvent {
    DomainEvent::OperatingMinutes(data)
}

fn decode_remaining_minutes(data: u32) -> DomainEvent {
    DomainEvent::RemainingMinutes(data)
}

fn decode_command_ack(data: u32) -> DomainEvent {
    DomainEvent::CommandAcknowledge(AckCommand::from(data))
}

fn decode_state_ack(data: u32) -> DomainEvent {
    DomainEvent::StateAcknowledge {
        light: flag(data, 17),
        heater: field(data, 14, 3) != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(registry: &CodeRegistry, code: u16, data: u32) -> DomainEvent {
        let rule = registry.get(code).expect("rule should be registered");
        (rule.decode)(data)
    }

    #[test]
    fn field_extraction() {
        assert_eq!(field(0x0016_38ab, 0, 11), 0x0ab);
        assert_eq!(field(0x0016_38ab, 11, 11), 0x2c7);
        assert_eq!(field(0xffff_ffff, 0, 32), 0xffff_ffff);
        assert_eq!(field(0xffff_ffff, 4, 0), 0);
        assert_eq!(field(0x8000_0000, 31, 1), 1);
        assert_eq!(field(0x8000_0000, 32, 1), 0);
        assert!(flag(0x19, 0));
        assert!(!flag(0x19, 1));
        assert!(flag(0x19, 4));
    }

    #[test]
    fn temperature_scaling() {
        let registry = CodeRegistry::standard();
        assert_eq!(
            decode(&registry, CODE_TEMPERATURE, 0x0016_38ab),
            DomainEvent::Temperature {
                actual: 171.0 / 9.0,
                setpoint: 711.0 / 9.0,
            }
        );
        // bits above 21 are ignored
        assert_eq!(
            decode(&registry, CODE_TEMPERATURE, 0xffc0_0000),
            DomainEvent::Temperature {
                actual: 0.0,
                setpoint: 0.0,
            }
        );
    }

    #[test]
    fn heater_state_bits() {
        let registry = CodeRegistry::standard();
        let cases = [
            (0x01, true, false, false),
            (0x09, true, true, false),
            (0x11, true, false, true),
            (0x19, true, true, true),
            (0x00, false, false, false),
        ];
        for (data, ready, light, heater) in cases {
            assert_eq!(
                decode(&registry, CODE_HEATER_STATE, data),
                DomainEvent::HeaterState {
                    ready,
                    light,
                    heater
                }
            );
        }
    }

    #[test]
    fn counters_pass_through() {
        let registry = CodeRegistry::standard();
        assert_eq!(
            decode(&registry, CODE_OPERATING_MINUTES, 0x23),
            DomainEvent::OperatingMinutes(35)
        );
        assert_eq!(
            decode(&registry, CODE_REMAINING_MINUTES, 0xb2),
            DomainEvent::RemainingMinutes(178)
        );
    }

    #[test]
    fn standard_registry_has_only_verified_codes() {
        let registry = CodeRegistry::standard();
        assert_eq!(registry.len(), 4);
        assert!(!registry.contains(CODE_STATE_ACK));
        assert!(!registry.contains(CODE_COMMAND_ACK));
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec![
                (0x3400, "heater_state"),
                (0x6000, "temperature"),
                (0x9400, "operating_minutes"),
                (0x9401, "remaining_minutes"),
            ]
        );
    }

    #[test]
    fn experimental_acknowledge_codes() {
        let registry = CodeRegistry::experimental();
        assert_eq!(registry.len(), 6);

        let cases = [
            (0x0000_0000, false, false),
            (0x0002_0000, true, false),
            (0x0001_c000, false, true),
            (0x0003_c000, true, true),
        ];
        for (data, light, heater) in cases {
            assert_eq!(
                decode(&registry, CODE_STATE_ACK, data),
                DomainEvent::StateAcknowledge { light, heater }
            );
        }

        assert_eq!(
            decode(&registry, CODE_COMMAND_ACK, 1),
            DomainEvent::CommandAcknowledge(AckCommand::HeaterToggle)
        );
        assert_eq!(
            decode(&registry, CODE_COMMAND_ACK, 2),
            DomainEvent::CommandAcknowledge(AckCommand::LightToggle)
        );
        assert_eq!(
            decode(&registry, CODE_COMMAND_ACK, 7),
            DomainEvent::CommandAcknowledge(AckCommand::Other(7))
        );
    }

    #[test]
    fn rules_can_be_added_and_replaced() {
        fn bathing_setting(data: u32) -> DomainEvent {
            DomainEvent::RemainingMinutes(field(data, 6, 4) * 60)
        }

        let registry = CodeRegistry::empty().with_rule(0x4002, "bathing_setting", bathing_setting);
        assert_eq!(
            decode(&registry, 0x4002, 0x7bcb_4040),
            DomainEvent::RemainingMinutes(60)
        );

        let registry = CodeRegistry::standard().with_rule(
            CODE_OPERATING_MINUTES,
            "operating_minutes",
            decode_remaining_minutes,
        );
        assert_eq!(registry.len(), 4);
        assert_eq!(
            decode(&registry, CODE_OPERATING_MINUTES, 5),
            DomainEvent::RemainingMinutes(5)
        );
    }
}
