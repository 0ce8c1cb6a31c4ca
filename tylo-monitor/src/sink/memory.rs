use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tylo_core::Reading;

use super::EventSink;

/// In-memory sink.
/// Keeps every reading in arrival order; used by tests and offline tooling.
#[derive(Clone, Default)]
pub struct MemorySink {
    readings: Arc<Mutex<Vec<Reading>>>,
}

/// Error type for MemorySink
#[derive(Debug)]
pub enum MemorySinkError {
    MutexPoisoned(String),
}

impl std::error::Error for MemorySinkError {}

impl fmt::Display for MemorySinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemorySinkError::MutexPoisoned(msg) => write!(f, "Mutex poisoned: {}", msg),
        }
    }
}

impl<T> From<PoisonError<T>> for MemorySinkError {
    fn from(err: PoisonError<T>) -> Self {
        MemorySinkError::MutexPoisoned(err.to_string())
    }
}

impl MemorySink {
    /// Copy of everything published so far.
    pub fn readings(&self) -> Result<Vec<Reading>, MemorySinkError> {
        Ok(self.readings.lock()?.clone())
    }

    pub fn len(&self) -> Result<usize, MemorySinkError> {
        Ok(self.readings.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, MemorySinkError> {
        Ok(self.readings.lock()?.is_empty())
    }
}

#[async_trait]
impl EventSink for MemorySink {
    type Error = MemorySinkError;

    async fn publish(&self, reading: &Reading) -> Result<(), Self::Error> {
        self.readings.lock()?.push(reading.clone());
        Ok(())
    }
}
