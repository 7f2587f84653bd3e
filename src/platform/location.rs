use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::Position;

use super::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Web,
    Desktop,
}

impl Platform {
    pub fn is_web(&self) -> bool {
        matches!(self, Platform::Web)
    }
}

/// How the provider combines `min_interval` and `min_distance_m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSemantics {
    /// An update fires once either threshold is met.
    Either,
    /// An update fires only once both thresholds are met.
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

impl WatchOptions {
    /// Every fix the platform produces, no rate limiting.
    pub fn unfiltered() -> Self {
        Self {
            min_interval: Duration::ZERO,
            min_distance_m: 0.0,
        }
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    fn platform(&self) -> Platform;

    fn trigger_semantics(&self) -> TriggerSemantics {
        TriggerSemantics::Either
    }

    /// Suspends until the user answers; `Ok(false)` means denied.
    async fn request_foreground_permission(&self) -> Result<bool>;

    async fn request_background_permission(&self) -> Result<bool>;

    async fn current_position(&self) -> Result<Position>;

    /// Starts a position stream. Fixes are delivered on `updates` until the
    /// returned subscription is removed.
    fn watch_position(
        &self,
        options: WatchOptions,
        updates: mpsc::UnboundedSender<Position>,
    ) -> Result<Box<dyn Subscription>>;
}
