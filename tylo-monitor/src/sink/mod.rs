pub mod http;
pub mod log;
pub mod memory;
pub mod stdout;

use async_trait::async_trait;
use serde::Serialize;
use tylo_core::{AckCommand, DomainEvent, Reading};

pub use http::{HttpSink, HttpSinkError};
pub use log::LogSink;
pub use memory::{MemorySink, MemorySinkError};
pub use stdout::{StdoutSink, StdoutSinkError};

/// Destination for decoded readings.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Error type specific to this sink implementation
    type Error: std::error::Error + Send + Sync + 'static;

    /// Externalize one reading. Called in frame order.
    async fn publish(&self, reading: &Reading) -> Result<(), Self::Error>;
}

/// A single value bound for a named channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
}

/// Maps events to the channels the home-automation side subscribes to.
#[derive(Debug, Clone)]
pub struct TopicMap {
    namespace: String,
    publish_unknown: bool,
}

#[derive(Serialize)]
struct StatePayload {
    ready: bool,
    light: bool,
    heater: bool,
}

#[derive(Serialize)]
struct StateAckPayload {
    light: bool,
    heater: bool,
}

#[derive(Serialize)]
struct RawPayload {
    address: String,
    kind: String,
    code: Option<String>,
    data: Option<String>,
}

impl TopicMap {
    pub fn new(namespace: impl Into<String>, publish_unknown: bool) -> Self {
        Self {
            namespace: namespace.into(),
            publish_unknown,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Publications for one event, in publish order.
    ///
    /// Unknown packets map to nothing unless `publish_unknown` is set.
    pub fn publications(&self, event: &DomainEvent) -> Vec<Publication> {
        match event {
            DomainEvent::Temperature { actual, setpoint } => vec![
                self.publication("temp_set", number(*setpoint)),
                self.publication("temp_actual", number(*actual)),
            ],
            DomainEvent::HeaterState {
                ready,
                light,
                heater,
            } => vec![self.publication(
                "state",
                json(&StatePayload {
                    ready: *ready,
                    light: *light,
                    heater: *heater,
                }),
            )],
            DomainEvent::OperatingMinutes(minutes) => {
                vec![self.publication("up_time", minutes.to_string())]
            }
            DomainEvent::RemainingMinutes(minutes) => {
                vec![self.publication("bathing_time", minutes.to_string())]
            }
            DomainEvent::StateAcknowledge { light, heater } => vec![self.publication(
                "state_ack",
                json(&StateAckPayload {
                    light: *light,
                    heater: *heater,
                }),
            )],
            DomainEvent::CommandAcknowledge(command) => {
                let payload = match command {
                    AckCommand::None => "none".to_string(),
                    AckCommand::HeaterToggle => "heater_toggle".to_string(),
                    AckCommand::LightToggle => "light_toggle".to_string(),
                    AckCommand::Other(value) => value.to_string(),
                };
                vec![self.publication("command_ack", payload)]
            }
            DomainEvent::RawUnknown {
                address,
                kind,
                code,
                data,
            } => {
                if !self.publish_unknown {
                    return Vec::new();
                }
                vec![self.publication(
                    "raw",
                    json(&RawPayload {
                        address: format!("{address:02x}"),
                        kind: format!("{:02x}", u8::from(*kind)),
                        code: code.map(|c| format!("{c:04x}")),
                        data: data.map(|d| format!("{d:08x}")),
                    }),
                )]
            }
        }
    }

    fn publication(&self, channel: &str, payload: String) -> Publication {
        Publication {
            topic: format!("{}/{}", self.namespace, channel),
            payload,
        }
    }
}

impl Default for TopicMap {
    fn default() -> Self {
        Self::new("sauna", false)
    }
}

// serde_json keeps a trailing `.0` on whole degrees
fn number(value: f64) -> String {
    serde_json::to_string(&value).unwrap_or_else(|_| value.to_string())
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
