use std::sync::{Arc, Mutex};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::{LocationSample, PresenceState},
    platform::{LocationProvider, Subscription, TriggerSemantics, WatchOptions},
    sync::LocationSink,
};

use super::{
    gate::MovementGate,
    worker::{continuous_loop, periodic_loop, LatestSample, SampleContext},
    SamplerSettings, TrackingMode,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// The one live tracking resource. Continuous mode owns a platform
/// subscription plus the task draining it; periodic mode owns a timer task.
struct ActiveTracking {
    mode: TrackingMode,
    subscription: Option<Box<dyn Subscription>>,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

pub struct LocationSampler {
    provider: Arc<dyn LocationProvider>,
    sink: Arc<dyn LocationSink>,
    presence: watch::Receiver<PresenceState>,
    settings: SamplerSettings,
    permission_granted: bool,
    active: Option<ActiveTracking>,
    latest: LatestSample,
}

impl LocationSampler {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        sink: Arc<dyn LocationSink>,
        presence: watch::Receiver<PresenceState>,
        settings: SamplerSettings,
    ) -> Self {
        Self {
            provider,
            sink,
            presence,
            settings,
            permission_granted: false,
            active: None,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_mode(&self) -> Option<TrackingMode> {
        self.active.as_ref().map(|active| active.mode)
    }

    pub fn permission_granted(&self) -> bool {
        self.permission_granted
    }

    pub fn latest_sample(&self) -> Option<LocationSample> {
        match self.latest.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn context(&self) -> SampleContext {
        SampleContext {
            provider: Arc::clone(&self.provider),
            sink: Arc::clone(&self.sink),
            presence: self.presence.clone(),
            latest: Arc::clone(&self.latest),
            acquisition_timeout: self.settings.acquisition_timeout,
        }
    }

    /// Checks the cached grant, prompting the user when it is missing.
    /// Background permission is best-effort and never blocks tracking.
    pub async fn ensure_permission(&mut self) -> bool {
        if self.permission_granted {
            return true;
        }

        match self.provider.request_foreground_permission().await {
            Ok(true) => {}
            Ok(false) => {
                log_warn!("Foreground location permission denied");
                return false;
            }
            Err(err) => {
                log_error!("Error requesting location permission: {err:?}");
                return false;
            }
        }

        if !self.provider.platform().is_web() {
            match self.provider.request_background_permission().await {
                Ok(granted) => log_info!("Background location permission granted: {granted}"),
                Err(err) => log_warn!("Background location permission request failed: {err:?}"),
            }
        }

        log_info!("Location permissions granted");
        self.permission_granted = true;
        true
    }

    /// Switches to `mode`, tearing down whatever was running first.
    /// Returns `false` when permission is denied or the platform refuses the
    /// subscription; nothing is left running in that case.
    pub async fn start(&mut self, mode: TrackingMode) -> bool {
        if !self.ensure_permission().await {
            return false;
        }

        self.teardown().await;

        log_info!("Starting {} location tracking", mode.as_str());
        let ctx = self.context();

        // Take a fix right away so the new mode starts without a gap.
        ctx.acquire_and_forward().await;

        let cancel_token = CancellationToken::new();
        let (subscription, handle) = match mode {
            TrackingMode::Continuous => {
                let (options, gate) = self.watch_plan();
                let (updates_tx, updates_rx) = mpsc::unbounded_channel();
                let subscription = match self.provider.watch_position(options, updates_tx) {
                    Ok(subscription) => subscription,
                    Err(err) => {
                        log_error!("Failed to subscribe to position updates: {err:?}");
                        return false;
                    }
                };
                let handle = tokio::spawn(continuous_loop(
                    ctx,
                    updates_rx,
                    gate,
                    cancel_token.clone(),
                ));
                (Some(subscription), handle)
            }
            TrackingMode::Periodic => {
                let handle = tokio::spawn(periodic_loop(
                    ctx,
                    self.settings.periodic_interval,
                    cancel_token.clone(),
                ));
                (None, handle)
            }
        };

        self.active = Some(ActiveTracking {
            mode,
            subscription,
            handle,
            cancel_token,
        });
        true
    }

    pub async fn apply_presence(&mut self, is_online: bool) -> bool {
        self.start(TrackingMode::for_presence(is_online)).await
    }

    /// One immediate fix outside the regular cadence, e.g. after the OS may
    /// have suspended the stream while backgrounded. No-op when idle.
    pub async fn resample(&self) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.context().acquire_and_forward().await
    }

    /// Idempotent; safe when nothing was ever started.
    pub async fn stop(&mut self) {
        if self.active.is_some() {
            log_info!("Stopping location tracking");
        }
        self.teardown().await;
    }

    fn watch_plan(&self) -> (WatchOptions, Option<MovementGate>) {
        let requested = WatchOptions {
            min_interval: self.settings.continuous_interval,
            min_distance_m: self.settings.continuous_distance_m,
        };

        match self.provider.trigger_semantics() {
            TriggerSemantics::Either => (requested, None),
            TriggerSemantics::Both => (WatchOptions::unfiltered(), Some(MovementGate::new(requested))),
        }
    }

    async fn teardown(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        if let Some(subscription) = active.subscription {
            subscription.remove();
        }
        active.cancel_token.cancel();

        if let Err(err) = active.handle.await {
            if !err.is_cancelled() {
                log_error!("{} tracking task failed to join: {err}", active.mode.as_str());
            }
        }
    }
}

impl Drop for LocationSampler {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            if let Some(subscription) = active.subscription {
                subscription.remove();
            }
            active.cancel_token.cancel();
        }
    }
}
