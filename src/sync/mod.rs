//! Best-effort forwarding of location samples to the backend.
//!
//! The contract is deliberately lossy: no retry, no queue, no backoff. A
//! failed push is logged and dropped because the sampler produces a fresher
//! sample on its next tick (seconds away online, minutes away offline), and a
//! retried stale fix would only be overwritten by it.

use async_trait::async_trait;
use serde::Serialize;

use crate::models::LocationSample;

mod http;
mod token;

pub use http::HttpSyncForwarder;
pub use token::{SessionTokenStore, TokenSource};

#[async_trait]
pub trait LocationSink: Send + Sync {
    /// Fire-and-forget. Implementations log failures and never surface them.
    async fn push(&self, sample: &LocationSample, is_online: bool);
}

/// Body of the location-ingest request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Epoch milliseconds of the fix.
    pub timestamp: i64,
    pub is_online: bool,
}

impl LocationUpdate {
    pub fn new(sample: &LocationSample, is_online: bool) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: sample.accuracy,
            heading: sample.heading,
            speed: sample.speed,
            timestamp: sample.captured_at.timestamp_millis(),
            is_online,
        }
    }
}
