use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{watch, Mutex};

use crate::{
    models::PresenceState,
    notify::OnlineIndicator,
    platform::Clock,
    store::{KeyValueStore, IS_ONLINE_KEY, LAST_ACTIVITY_KEY},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Sole writer of [`PresenceState`]. Everything else reads through
/// [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe).
///
/// The in-memory value is authoritative for the process lifetime; a failed
/// write to the store is logged and otherwise ignored.
#[derive(Clone)]
pub struct PresenceStateHolder {
    state: Arc<Mutex<PresenceState>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    indicator: OnlineIndicator,
    publisher: Arc<watch::Sender<PresenceState>>,
}

impl PresenceStateHolder {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        indicator: OnlineIndicator,
    ) -> Self {
        let (publisher, _) = watch::channel(PresenceState::offline());
        Self {
            state: Arc::new(Mutex::new(PresenceState::offline())),
            store,
            clock,
            indicator,
            publisher: Arc::new(publisher),
        }
    }

    pub async fn snapshot(&self) -> PresenceState {
        *self.state.lock().await
    }

    pub async fn is_online(&self) -> bool {
        self.state.lock().await.is_online
    }

    pub fn subscribe(&self) -> watch::Receiver<PresenceState> {
        self.publisher.subscribe()
    }

    pub fn indicator(&self) -> &OnlineIndicator {
        &self.indicator
    }

    pub async fn set_online(&self, value: bool) {
        let now = self.clock.now();
        let (previous, next) = {
            let mut guard = self.state.lock().await;
            let previous = guard.is_online;
            guard.is_online = value;
            guard.last_activity_at = Some(now);
            (previous, *guard)
        };

        self.publisher.send_replace(next);
        log_info!("Presence set to {}", if value { "online" } else { "offline" });

        if let Err(err) = self.persist(&next).await {
            log_warn!("Failed to persist presence: {err:?}");
        }

        if previous != value {
            self.indicator.sync(value).await;

            // Another writer may have flipped the flag while the presenter
            // was prompting.
            let current = self.is_online().await;
            if current != value {
                self.indicator.sync(current).await;
            }
        }
    }

    pub async fn touch_activity(&self) {
        let now = self.clock.now();
        let next = {
            let mut guard = self.state.lock().await;
            guard.last_activity_at = Some(now);
            *guard
        };

        self.publisher.send_replace(next);
        log_debug!("Activity recorded at {now}");

        if let Err(err) = self
            .store
            .set(LAST_ACTIVITY_KEY, &now.timestamp_millis().to_string())
            .await
        {
            log_warn!("Failed to persist last activity: {err:?}");
        }
    }

    /// Reads the persisted state without installing it in memory. Missing or
    /// unreadable entries fall back to offline with no recorded activity, and
    /// unreadable entries are reset in the store.
    pub async fn load_from_disk(&self) -> PresenceState {
        match self.read_persisted().await {
            Ok(state) => state,
            Err(err) => {
                log_warn!("Failed to load persisted presence, assuming offline: {err:?}");
                if let Err(err) = self.reset_persisted().await {
                    log_warn!("Failed to reset persisted presence: {err:?}");
                }
                PresenceState::offline()
            }
        }
    }

    /// Installs a loaded state in memory. Only used once at cold start.
    pub async fn restore(&self, state: PresenceState) {
        *self.state.lock().await = state;
        self.publisher.send_replace(state);
    }

    async fn read_persisted(&self) -> Result<PresenceState> {
        let is_online = self
            .store
            .get(IS_ONLINE_KEY)
            .await
            .context("failed to read is_online")?
            .map(|raw| raw == "true")
            .unwrap_or(false);

        let last_activity_at = match self
            .store
            .get(LAST_ACTIVITY_KEY)
            .await
            .context("failed to read last_activity_time")?
        {
            Some(raw) => Some(parse_millis(&raw)?),
            None => None,
        };

        Ok(PresenceState {
            is_online,
            last_activity_at,
        })
    }

    async fn reset_persisted(&self) -> Result<()> {
        self.store.set(IS_ONLINE_KEY, "false").await?;
        self.store.remove(LAST_ACTIVITY_KEY).await
    }

    async fn persist(&self, state: &PresenceState) -> Result<()> {
        self.store
            .set(IS_ONLINE_KEY, if state.is_online { "true" } else { "false" })
            .await?;
        if let Some(at) = state.last_activity_at {
            self.store
                .set(LAST_ACTIVITY_KEY, &at.timestamp_millis().to_string())
                .await?;
        }
        Ok(())
    }
}

fn parse_millis(raw: &str) -> Result<DateTime<Utc>> {
    let millis: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid last_activity_time '{raw}'"))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| anyhow!("last_activity_time {millis} out of range"))
}
