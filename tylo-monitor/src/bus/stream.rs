use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use tylo_core::protocol::{FRAME_END, FRAME_START};

use super::{FrameSourceError, RawFrame};

/// Longest run of bytes buffered while waiting for an end marker.
///
/// A stuffed frame with a 4-byte data word is at most 22 bytes long.
pub const MAX_FRAME_LEN: usize = 64;

/// Why [`read_frames`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Eof,
    Cancelled,
}

/// Pick the frame out of a chunk that ends at an end marker.
///
/// The frame starts at the last start marker in the chunk, so bytes left
/// over from a frame whose end marker was lost are skipped. Returns `None`
/// when the chunk is unterminated or holds no start marker.
pub fn extract_frame(chunk: &[u8]) -> Option<&[u8]> {
    if chunk.last() != Some(&FRAME_END) {
        return None;
    }
    let start = chunk.iter().rposition(|&b| b == FRAME_START)?;
    Some(&chunk[start..])
}

/// Split a byte stream into frames and send them down `tx`.
///
/// Frame boundaries are independent of how the reader chunks its data. No
/// more than [`MAX_FRAME_LEN`] bytes are buffered; a longer run without an
/// end marker is dropped, keeping only what follows its last start marker.
pub async fn read_frames<R>(
    reader: R,
    tx: &mpsc::Sender<RawFrame>,
    cancel: &CancellationToken,
) -> Result<StreamEnd, FrameSourceError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut chunk = Vec::with_capacity(MAX_FRAME_LEN);

    loop {
        let budget = (MAX_FRAME_LEN - chunk.len()) as u64;
        let mut limited = (&mut reader).take(budget);

        let n = tokio::select! {
            _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            read = limited.read_until(FRAME_END, &mut chunk) => read?,
        };

        if n == 0 {
            return Ok(StreamEnd::Eof);
        }

        if chunk.last() != Some(&FRAME_END) {
            if chunk.len() >= MAX_FRAME_LEN {
                match chunk.iter().rposition(|&b| b == FRAME_START) {
                    Some(start) if start > 0 => {
                        warn!(skipped = start, "Discarding overlong run without end marker");
                        chunk.drain(..start);
                    }
                    _ => {
                        warn!(skipped = chunk.len(), "Discarding overlong run without end marker");
                        chunk.clear();
                    }
                }
            }
            continue;
        }

        match extract_frame(&chunk) {
            Some(frame) => {
                if frame.len() < chunk.len() {
                    debug!(skipped = chunk.len() - frame.len(), "Resynchronised on frame start");
                }
                trace!(len = frame.len(), "Frame received");
                tx.send(RawFrame::new(frame))
                    .await
                    .map_err(|_| FrameSourceError::ChannelClosed)?;
            }
            None => debug!(bytes = chunk.len(), "Discarding bytes outside a frame"),
        }
        chunk.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_requires_both_markers() {
        assert_eq!(extract_frame(&[0x98, 0x01, 0x9c]), Some(&[0x98, 0x01, 0x9c][..]));
        assert_eq!(extract_frame(&[0x00, 0x01, 0x9c]), None);
        assert_eq!(extract_frame(&[0x98, 0x01]), None);
        assert_eq!(extract_frame(&[]), None);
    }

    #[test]
    fn extract_resyncs_on_last_start() {
        assert_eq!(
            extract_frame(&[0x98, 0x40, 0x07, 0x98, 0x40, 0x06, 0x6d, 0x3a, 0x9c]),
            Some(&[0x98, 0x40, 0x06, 0x6d, 0x3a, 0x9c][..])
        );
    }
}
