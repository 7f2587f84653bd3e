use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    sync::{mpsc, watch},
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::{LocationSample, Position, PresenceState},
    platform::LocationProvider,
    sync::LocationSink,
};

use super::gate::MovementGate;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub(crate) type LatestSample = Arc<Mutex<Option<LocationSample>>>;

/// Everything a sampling task needs to acquire a fix and hand it on.
#[derive(Clone)]
pub(crate) struct SampleContext {
    pub provider: Arc<dyn LocationProvider>,
    pub sink: Arc<dyn LocationSink>,
    pub presence: watch::Receiver<PresenceState>,
    pub latest: LatestSample,
    pub acquisition_timeout: Duration,
}

impl SampleContext {
    async fn acquire(&self) -> Option<Position> {
        let fut = self.provider.current_position();
        match time::timeout(self.acquisition_timeout, fut).await {
            Ok(Ok(position)) => Some(position),
            Ok(Err(err)) => {
                log_warn!("Location acquisition failed: {err:?}");
                None
            }
            Err(_) => {
                log_warn!(
                    "Location acquisition timed out (> {}s)",
                    self.acquisition_timeout.as_secs()
                );
                None
            }
        }
    }

    /// Records the fix and hands it to the sink on a detached task; the
    /// caller never waits on the network.
    pub fn forward(&self, position: &Position) {
        let sample = LocationSample::from(position);
        let is_online = self.presence.borrow().is_online;

        log_debug!(
            "Location sample {:.5},{:.5} ({})",
            sample.latitude,
            sample.longitude,
            if is_online { "online" } else { "offline" }
        );

        {
            let mut latest = match self.latest.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *latest = Some(sample.clone());
        }

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            sink.push(&sample, is_online).await;
        });
    }

    /// Returns whether a sample was produced.
    pub async fn acquire_and_forward(&self) -> bool {
        match self.acquire().await {
            Some(position) => {
                self.forward(&position);
                true
            }
            None => false,
        }
    }
}

pub(crate) async fn continuous_loop(
    ctx: SampleContext,
    mut updates: mpsc::UnboundedReceiver<Position>,
    mut gate: Option<MovementGate>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_debug!("continuous sampling loop shutting down");
                break;
            }
            update = updates.recv() => {
                let Some(position) = update else {
                    log_warn!("position stream closed by provider");
                    break;
                };

                if let Some(gate) = gate.as_mut() {
                    if !gate.admit(&position) {
                        continue;
                    }
                }

                ctx.forward(&position);
            }
        }
    }
}

pub(crate) async fn periodic_loop(
    ctx: SampleContext,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_debug!("periodic sampling loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                log_info!("Periodic location update ({}s interval)", period.as_secs());
                tokio::select! {
                    _ = ctx.acquire_and_forward() => {}
                    _ = cancel_token.cancelled() => break,
                }
            }
        }
    }
}
