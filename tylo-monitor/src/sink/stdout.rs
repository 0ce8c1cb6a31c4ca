use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use tylo_core::Reading;

use super::{EventSink, TopicMap};

#[derive(Debug, thiserror::Error)]
pub enum StdoutSinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Line<'a> {
    topic: &'a str,
    payload: &'a str,
    received_at: jiff::Timestamp,
}

/// Writes one JSON object per publication, newline delimited.
pub struct StdoutSink<W = Stdout> {
    topics: TopicMap,
    out: Mutex<W>,
}

impl StdoutSink<Stdout> {
    pub fn new(topics: TopicMap) -> Self {
        Self::with_writer(topics, tokio::io::stdout())
    }
}

impl<W> StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn with_writer(topics: TopicMap, out: W) -> Self {
        Self {
            topics,
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> EventSink for StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Error = StdoutSinkError;

    async fn publish(&self, reading: &Reading) -> Result<(), Self::Error> {
        let publications = self.topics.publications(&reading.event);
        if publications.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for publication in &publications {
            serde_json::to_writer(
                &mut buf,
                &Line {
                    topic: &publication.topic,
                    payload: &publication.payload,
                    received_at: reading.received_at,
                },
            )?;
            buf.push(b'\n');
        }

        let mut out = self.out.lock().await;
        out.write_all(&buf).await?;
        out.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tylo_core::DomainEvent;

    #[tokio::test]
    async fn writes_json_lines() {
        let sink = StdoutSink::with_writer(TopicMap::default(), Vec::new());
        let received_at: jiff::Timestamp = "2024-03-01T18:30:00Z".parse().unwrap();

        let reading = Reading::new(
            DomainEvent::Temperature {
                actual: 19.0,
                setpoint: 79.0,
            },
            received_at,
        );
        sink.publish(&reading).await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["topic"], "sauna/temp_set");
        assert_eq!(lines[0]["payload"], "79.0");
        assert_eq!(lines[1]["topic"], "sauna/temp_actual");
        assert_eq!(lines[1]["received_at"], "2024-03-01T18:30:00Z");
    }
}
