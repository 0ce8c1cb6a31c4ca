pub mod device;
pub mod stream;
pub mod tcp;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use device::DeviceFrameSource;
pub use stream::{MAX_FRAME_LEN, StreamEnd, extract_frame, read_frames};
pub use tcp::TcpFrameSource;

/// Capacity of the channel between a frame source and the decode pipeline.
pub const FRAME_CHANNEL_CAPACITY: usize = 256;

/// One delimited frame as it appeared on the wire, markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub bytes: Box<[u8]>,
    pub received_at: jiff::Timestamp,
}

impl RawFrame {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            received_at: jiff::Timestamp::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameSourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal frame channel closed")]
    ChannelClosed,
}

/// Trait for byte transports carrying the heater bus.
///
/// Implementations spawn a background task that splits the byte stream into
/// frames and sends them, in arrival order, to the returned channel. The task
/// runs until the cancellation token is cancelled or the transport is
/// exhausted, after which the channel closes.
#[async_trait]
pub trait FrameSource: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RawFrame>, Self::Error>;
}
