use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::{AppExecutionState, LifecycleObservation, LocationSample, PresenceState},
    platform::{Clock, LifecyclePort, Subscription},
    presence::PresenceStateHolder,
    tracking::{LocationSampler, TrackingMode},
};

use super::state::{LifecyclePhase, LifecycleTracker, Transition};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub inactivity_timeout: chrono::Duration,
    pub heartbeat_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout: chrono::Duration::minutes(30),
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub presence: PresenceState,
    pub phase: LifecyclePhase,
    pub tracking_mode: Option<TrackingMode>,
    pub permission_granted: bool,
    pub tracking_disabled: bool,
    pub latest_sample: Option<LocationSample>,
}

struct Listener {
    subscription: Box<dyn Subscription>,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Orchestrates presence, sampling and app lifecycle: corrects stale
/// presence at cold start, revokes presence after a long absence, keeps the
/// activity heartbeat alive while online and picks the sampler mode.
#[derive(Clone)]
pub struct LifecycleMonitor {
    holder: PresenceStateHolder,
    sampler: Arc<Mutex<LocationSampler>>,
    lifecycle: Arc<dyn LifecyclePort>,
    clock: Arc<dyn Clock>,
    tracker: Arc<Mutex<LifecycleTracker>>,
    settings: MonitorSettings,
    heartbeat: Arc<Mutex<Option<JoinHandle<()>>>>,
    listener: Arc<Mutex<Option<Listener>>>,
    tracking_disabled: Arc<AtomicBool>,
}

impl LifecycleMonitor {
    pub fn new(
        holder: PresenceStateHolder,
        sampler: LocationSampler,
        lifecycle: Arc<dyn LifecyclePort>,
        clock: Arc<dyn Clock>,
        settings: MonitorSettings,
    ) -> Self {
        let initial = lifecycle.current_state();
        Self {
            holder,
            sampler: Arc::new(Mutex::new(sampler)),
            lifecycle,
            clock,
            tracker: Arc::new(Mutex::new(LifecycleTracker::new(initial))),
            settings,
            heartbeat: Arc::new(Mutex::new(None)),
            listener: Arc::new(Mutex::new(None)),
            tracking_disabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn presence(&self) -> &PresenceStateHolder {
        &self.holder
    }

    pub fn tracking_disabled(&self) -> bool {
        self.tracking_disabled.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> EngineStatus {
        let presence = self.holder.snapshot().await;
        let phase = self.tracker.lock().await.phase();
        let sampler = self.sampler.lock().await;
        EngineStatus {
            presence,
            phase,
            tracking_mode: sampler.active_mode(),
            permission_granted: sampler.permission_granted(),
            tracking_disabled: self.tracking_disabled(),
            latest_sample: sampler.latest_sample(),
        }
    }

    /// Cold start. Stale presence is corrected before anything samples or
    /// publishes an online flag.
    pub async fn start(&self) -> Result<()> {
        if self.listener.lock().await.is_some() {
            bail!("lifecycle monitor already started");
        }

        self.holder.indicator().prepare().await;

        let now = self.clock.now();
        let persisted = self.holder.load_from_disk().await;
        if persisted.is_stale(now, self.settings.inactivity_timeout) {
            log_warn!(
                "Inactivity detected (last activity {:?}); setting offline",
                persisted.last_activity_at
            );
            self.holder.set_online(false).await;
        } else {
            self.holder.restore(persisted).await;
        }

        // A killed process may have left the notification up.
        let is_online = self.holder.is_online().await;
        self.holder.indicator().sync(is_online).await;

        *self.tracker.lock().await = LifecycleTracker::new(self.lifecycle.current_state());

        self.sync_heartbeat(is_online).await;
        self.switch_tracking().await;
        self.listen().await;

        log_info!(
            "Lifecycle monitor started ({})",
            if is_online { "online" } else { "offline" }
        );
        Ok(())
    }

    /// User toggle. Returns whether tracking is running afterwards; `false`
    /// means the location permission was refused and tracking is disabled
    /// until the user toggles again.
    pub async fn set_online(&self, value: bool) -> bool {
        self.holder.set_online(value).await;
        self.sync_heartbeat(self.holder.is_online().await).await;
        self.switch_tracking().await
    }

    pub async fn handle_transition(&self, state: AppExecutionState) {
        let observation = LifecycleObservation {
            state,
            transitioned_at: self.clock.now(),
        };
        let transition = self.tracker.lock().await.observe(observation);

        match transition {
            Transition::EnteredBackground => {
                log_info!("App going to background");
                self.holder.touch_activity().await;
            }
            Transition::ReturnedToForeground { away } => {
                log_info!("App coming to foreground");

                if let Some(away) = away {
                    if away > self.settings.inactivity_timeout && self.holder.is_online().await {
                        log_warn!(
                            "Background for {} minutes; setting offline",
                            away.num_minutes()
                        );
                        self.revoke_presence().await;
                    }
                }

                self.holder.touch_activity().await;

                let sampler = self.sampler.lock().await;
                if sampler.is_tracking() {
                    sampler.resample().await;
                }
            }
            Transition::Unchanged => {}
        }
    }

    /// Idempotent teardown of the listener, heartbeat and sampler.
    pub async fn shutdown(&self) {
        let listener = self.listener.lock().await.take();
        if let Some(listener) = listener {
            listener.subscription.remove();
            listener.cancel_token.cancel();
            if let Err(err) = listener.handle.await {
                if !err.is_cancelled() {
                    log_error!("lifecycle listener failed to join: {err}");
                }
            }
        }

        self.cancel_heartbeat().await;
        self.sampler.lock().await.stop().await;
    }

    async fn revoke_presence(&self) {
        self.holder.set_online(false).await;
        self.sync_heartbeat(false).await;

        let mut sampler = self.sampler.lock().await;
        if sampler.is_tracking() {
            let is_online = self.holder.is_online().await;
            sampler.apply_presence(is_online).await;
        }
    }

    /// Follows the holder's flag as read under the sampler lock, so a toggle
    /// and a revocation racing each other settle on the final presence.
    async fn switch_tracking(&self) -> bool {
        let mut sampler = self.sampler.lock().await;
        let is_online = self.holder.is_online().await;
        let started = sampler.apply_presence(is_online).await;
        drop(sampler);
        self.tracking_disabled.store(!started, Ordering::SeqCst);
        if !started {
            log_warn!("Location tracking disabled; waiting for the user to retry");
        }
        started
    }

    async fn listen(&self) {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let subscription = self.lifecycle.subscribe(events_tx);
        let cancel_token = CancellationToken::new();

        let monitor = self.clone();
        let token = cancel_token.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = events_rx.recv() => match event {
                        Some(state) => monitor.handle_transition(state).await,
                        None => break,
                    },
                }
            }
        });

        *self.listener.lock().await = Some(Listener {
            subscription,
            handle,
            cancel_token,
        });
    }

    async fn sync_heartbeat(&self, is_online: bool) {
        if is_online {
            self.spawn_heartbeat().await;
        } else {
            self.cancel_heartbeat().await;
        }
    }

    async fn spawn_heartbeat(&self) {
        let mut heartbeat_guard = self.heartbeat.lock().await;
        if let Some(handle) = heartbeat_guard.take() {
            handle.abort();
        }

        let holder = self.holder.clone();
        let period = self.settings.heartbeat_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !holder.is_online().await {
                    break;
                }
                holder.touch_activity().await;
            }
        });

        *heartbeat_guard = Some(handle);
    }

    async fn cancel_heartbeat(&self) {
        if let Some(handle) = self.heartbeat.lock().await.take() {
            handle.abort();
        }
    }
}
