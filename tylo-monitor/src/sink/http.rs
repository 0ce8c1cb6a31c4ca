use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use tylo_core::{Reading, ReadingId};

use super::{EventSink, TopicMap};

#[derive(Debug, thiserror::Error)]
pub enum HttpSinkError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Endpoint rejected publication for {topic}: {status}")]
    Rejected {
        topic: String,
        status: reqwest::StatusCode,
    },
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    reading_id: ReadingId,
    topic: &'a str,
    payload: &'a str,
    received_at: jiff::Timestamp,
}

/// Posts each publication as JSON to an HTTP endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    topics: TopicMap,
}

impl HttpSink {
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        topics: TopicMap,
    ) -> Result<Self, HttpSinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
            topics,
        })
    }
}

#[async_trait]
impl EventSink for HttpSink {
    type Error = HttpSinkError;

    async fn publish(&self, reading: &Reading) -> Result<(), Self::Error> {
        for publication in self.topics.publications(&reading.event) {
            let body = PublishRequest {
                reading_id: reading.id,
                topic: &publication.topic,
                payload: &publication.payload,
                received_at: reading.received_at,
            };

            let mut request = self.client.post(&self.url).json(&body);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let resp = request.send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(HttpSinkError::Rejected {
                    topic: publication.topic,
                    status,
                });
            }
            debug!(topic = %publication.topic, %status, "Publication delivered");
        }
        Ok(())
    }
}
