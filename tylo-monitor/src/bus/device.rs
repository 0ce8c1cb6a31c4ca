use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use super::{FRAME_CHANNEL_CAPACITY, FrameSource, FrameSourceError, RawFrame, StreamEnd, read_frames};

/// Reads the bus from a serial device node or a recorded capture.
///
/// Line settings (19200 baud, 8 data bits, even parity, 1 stop bit) must be
/// applied to the device beforehand, e.g. with `stty`. A capture file is
/// replayed once and the channel closes at its end.
pub struct DeviceFrameSource {
    path: PathBuf,
}

impl DeviceFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FrameSource for DeviceFrameSource {
    type Error = FrameSourceError;

    async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RawFrame>, Self::Error> {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        let file = File::open(&self.path).await?;
        info!(path = ?self.path, "Device frame source opened");

        tokio::spawn(run_device_reader(file, tx, cancel, self.path.clone()));

        Ok(rx)
    }
}

#[instrument(name = "device_reader", skip(file, tx, cancel))]
async fn run_device_reader(
    file: File,
    tx: mpsc::Sender<RawFrame>,
    cancel: CancellationToken,
    path: PathBuf,
) {
    match read_frames(file, &tx, &cancel).await {
        Ok(StreamEnd::Eof) => info!("End of device stream"),
        Ok(StreamEnd::Cancelled) => info!("Device reader shutting down"),
        Err(e) => error!(error = %e, "Device reader stopped"),
    }
}
