use std::convert::Infallible;

use async_trait::async_trait;
use tracing::info;
use tylo_core::Reading;

use super::{EventSink, TopicMap};

/// Writes every publication to the log.
pub struct LogSink {
    topics: TopicMap,
}

impl LogSink {
    pub fn new(topics: TopicMap) -> Self {
        Self { topics }
    }
}

#[async_trait]
impl EventSink for LogSink {
    type Error = Infallible;

    async fn publish(&self, reading: &Reading) -> Result<(), Self::Error> {
        for publication in self.topics.publications(&reading.event) {
            info!(
                reading_id = %reading.id.0,
                topic = %publication.topic,
                payload = %publication.payload,
                "Publish"
            );
        }
        Ok(())
    }
}
