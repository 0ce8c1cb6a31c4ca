use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::{FRAME_CHANNEL_CAPACITY, FrameSource, FrameSourceError, RawFrame, StreamEnd, read_frames};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Reads the bus through a serial-to-TCP bridge, reconnecting on loss.
pub struct TcpFrameSource {
    addr: SocketAddr,
    max_backoff: Duration,
}

impl TcpFrameSource {
    pub fn new(addr: SocketAddr, max_backoff: Duration) -> Self {
        Self {
            addr,
            max_backoff: max_backoff.max(INITIAL_BACKOFF),
        }
    }
}

#[async_trait]
impl FrameSource for TcpFrameSource {
    type Error = FrameSourceError;

    async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RawFrame>, Self::Error> {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        tokio::spawn(run_tcp_reader(self.addr, self.max_backoff, tx, cancel));

        Ok(rx)
    }
}

#[instrument(name = "tcp_reader", skip(max_backoff, tx, cancel))]
async fn run_tcp_reader(
    addr: SocketAddr,
    max_backoff: Duration,
    tx: mpsc::Sender<RawFrame>,
    cancel: CancellationToken,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let connect = tokio::select! {
            _ = cancel.cancelled() => break,
            connect = TcpStream::connect(addr) => connect,
        };

        match connect {
            Ok(stream) => {
                info!("Connected to bus bridge");
                backoff = INITIAL_BACKOFF;

                match read_frames(stream, &tx, &cancel).await {
                    Ok(StreamEnd::Cancelled) => break,
                    Ok(StreamEnd::Eof) => warn!("Bus bridge closed the connection"),
                    Err(FrameSourceError::ChannelClosed) => {
                        error!("Frame channel closed, stopping reader");
                        break;
                    }
                    Err(e) => warn!(error = %e, "Bus bridge connection lost"),
                }
            }
            Err(e) => {
                warn!(error = %e, backoff_secs = backoff.as_secs(), "Failed to connect to bus bridge, will retry");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(max_backoff);
    }

    info!("TCP reader shutting down");
}
