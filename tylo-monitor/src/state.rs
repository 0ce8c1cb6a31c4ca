use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use serde::Serialize;
use tylo_core::{DecodeOutcome, FrameReport};

/// Point-in-time copy of the monitor counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames: u64,
    pub crc_errors: u64,
    pub keepalives: u64,
    /// Valid packets from the heater direction, not decoded.
    pub filtered: u64,
    pub events: u64,
    pub unknown_events: u64,
    pub warnings: u64,
    pub sink_errors: u64,
    pub last_event_at: Option<jiff::Timestamp>,
    pub uptime_seconds: u64,
}

/// Shared counters for the decode pipeline and the HTTP endpoint.
pub struct MonitorState {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    stats: StatsSnapshot,
    startup_time: Instant,
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                stats: StatsSnapshot::default(),
                startup_time: Instant::now(),
            })),
        }
    }

    /// Count a decoded frame by its outcome.
    pub async fn record_frame(&self, report: &FrameReport, received_at: jiff::Timestamp) {
        let mut inner = self.inner.lock().await;
        let stats = &mut inner.stats;

        stats.frames += 1;
        stats.warnings += report.warnings.len() as u64;

        match &report.outcome {
            DecodeOutcome::CrcMismatch { .. } => stats.crc_errors += 1,
            DecodeOutcome::KeepAlive => stats.keepalives += 1,
            DecodeOutcome::Filtered(_) => stats.filtered += 1,
            DecodeOutcome::Event(event) => {
                stats.events += 1;
                if matches!(event, tylo_core::DomainEvent::RawUnknown { .. }) {
                    stats.unknown_events += 1;
                }
                stats.last_event_at = Some(received_at);
            }
        }
    }

    /// Record that the sink rejected a reading.
    pub async fn record_sink_error(&self) {
        let mut inner = self.inner.lock().await;
        inner.stats.sink_errors += 1;
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock().await;
        StatsSnapshot {
            uptime_seconds: inner.startup_time.elapsed().as_secs(),
            ..inner.stats.clone()
        }
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MonitorState {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
