use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::{sync::mpsc, time};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Coordinates,
    models::Position,
    platform::{LocationProvider, Platform, Subscription, WatchOptions},
};

// Roughly 20 m of wander around the origin.
const JITTER_DEG: f64 = 0.0002;
const MIN_EMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Location provider for desktop runs: always grants permission and reports
/// fixes scattered around a fixed origin.
pub struct SimulatedLocationProvider {
    origin: Coordinates,
}

impl SimulatedLocationProvider {
    pub fn new(origin: Coordinates) -> Self {
        Self { origin }
    }
}

fn jittered(origin: Coordinates) -> Position {
    let mut rng = rand::thread_rng();
    Position {
        accuracy: Some(rng.gen_range(3.0..15.0)),
        speed: Some(rng.gen_range(0.0..2.0)),
        ..Position::new(
            origin.latitude + rng.gen_range(-JITTER_DEG..JITTER_DEG),
            origin.longitude + rng.gen_range(-JITTER_DEG..JITTER_DEG),
            Utc::now(),
        )
    }
}

#[async_trait]
impl LocationProvider for SimulatedLocationProvider {
    fn platform(&self) -> Platform {
        Platform::Desktop
    }

    async fn request_foreground_permission(&self) -> Result<bool> {
        Ok(true)
    }

    async fn request_background_permission(&self) -> Result<bool> {
        Ok(true)
    }

    async fn current_position(&self) -> Result<Position> {
        Ok(jittered(self.origin))
    }

    fn watch_position(
        &self,
        options: WatchOptions,
        updates: mpsc::UnboundedSender<Position>,
    ) -> Result<Box<dyn Subscription>> {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let origin = self.origin;
        let period = options.min_interval.max(MIN_EMIT_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if updates.send(jittered(origin)).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Box::new(SimulatedSubscription { cancel_token }))
    }
}

struct SimulatedSubscription {
    cancel_token: CancellationToken,
}

impl Subscription for SimulatedSubscription {
    fn remove(self: Box<Self>) {
        self.cancel_token.cancel();
    }
}
