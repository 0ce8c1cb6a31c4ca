use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};
use tylo_core::{DecodeOutcome, Decoder, DomainEvent, Reading, protocol::to_hex};

use crate::bus::RawFrame;
use crate::sink::EventSink;
use crate::state::MonitorState;

/// Drain the frame channel in order until it closes or `cancel` fires.
#[instrument(name = "decode_pipeline", skip_all)]
pub async fn run_pipeline<S: EventSink>(
    mut frames: mpsc::Receiver<RawFrame>,
    decoder: &Decoder,
    sink: &S,
    state: &MonitorState,
    cancel: CancellationToken,
) {
    info!(rules = decoder.registry().len(), "Decode pipeline started");
    for (code, name) in decoder.registry().names() {
        debug!(code = format_args!("{code:04x}"), name, "Decode rule");
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Decode pipeline shutting down");
                break;
            }
            frame = frames.recv() => match frame {
                Some(frame) => {
                    process_frame(&frame, decoder, sink, state).await;
                }
                None => {
                    info!("Frame source closed");
                    break;
                }
            },
        }
    }
}

/// Decode one frame, log what happened, and publish the event if any.
///
/// Returns the reading handed to the sink.
pub async fn process_frame<S: EventSink>(
    frame: &RawFrame,
    decoder: &Decoder,
    sink: &S,
    state: &MonitorState,
) -> Option<Reading> {
    let report = decoder.decode_frame(&frame.bytes);
    state.record_frame(&report, frame.received_at).await;

    for warning in &report.warnings {
        warn!(%warning, raw = %to_hex(&frame.bytes), "Decode anomaly");
    }

    let event = match report.outcome {
        DecodeOutcome::CrcMismatch { residue, raw_hex } => {
            warn!(residue = format_args!("{residue:04x}"), raw = %raw_hex, "CRC error, frame dropped");
            return None;
        }
        DecodeOutcome::KeepAlive => {
            trace!("Keepalive");
            return None;
        }
        DecodeOutcome::Filtered(packet) => {
            debug!(%packet, "Packet not decoded");
            return None;
        }
        DecodeOutcome::Event(event) => event,
    };

    match &event {
        DomainEvent::RawUnknown { .. } => info!(?event, "Unknown packet"),
        _ => debug!(?event, rule = report.rule, "Decoded event"),
    }

    let reading = Reading::new(event, frame.received_at);
    if let Err(e) = sink.publish(&reading).await {
        error!(error = %e, reading_id = %reading.id.0, "Failed to publish reading");
        state.record_sink_error().await;
    }

    Some(reading)
}
