//! Doubles shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{mpsc, Notify};

use crate::{
    models::{LocationSample, Position},
    notify::NotificationPresenter,
    platform::{Clock, LocationProvider, Platform, Subscription, TriggerSemantics, WatchOptions},
    store::KeyValueStore,
    sync::LocationSink,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let now = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid test timestamp");
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *lock(&self.now) += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

struct ProviderState {
    foreground_granted: bool,
    background_granted: bool,
    platform: Platform,
    semantics: TriggerSemantics,
    fail_acquisitions: bool,
    acquisitions: usize,
    foreground_requests: usize,
    background_requests: usize,
    last_watch_options: Option<WatchOptions>,
}

#[derive(Default)]
struct LiveSubscriptions {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<Position>>,
    max_live: usize,
}

/// Location provider with resource accounting for live subscriptions.
pub struct FakeLocationProvider {
    state: Mutex<ProviderState>,
    subscriptions: Arc<Mutex<LiveSubscriptions>>,
}

impl FakeLocationProvider {
    fn with_permission(granted: bool) -> Self {
        Self {
            state: Mutex::new(ProviderState {
                foreground_granted: granted,
                background_granted: true,
                platform: Platform::Android,
                semantics: TriggerSemantics::Either,
                fail_acquisitions: false,
                acquisitions: 0,
                foreground_requests: 0,
                background_requests: 0,
                last_watch_options: None,
            }),
            subscriptions: Arc::new(Mutex::new(LiveSubscriptions::default())),
        }
    }

    pub fn granted() -> Self {
        Self::with_permission(true)
    }

    pub fn denied() -> Self {
        Self::with_permission(false)
    }

    pub fn with_semantics(self, semantics: TriggerSemantics) -> Self {
        lock(&self.state).semantics = semantics;
        self
    }

    pub fn on_platform(self, platform: Platform) -> Self {
        lock(&self.state).platform = platform;
        self
    }

    pub fn deny_background(self) -> Self {
        lock(&self.state).background_granted = false;
        self
    }

    pub fn set_permission(&self, granted: bool) {
        lock(&self.state).foreground_granted = granted;
    }

    pub fn fail_acquisitions(&self, fail: bool) {
        lock(&self.state).fail_acquisitions = fail;
    }

    pub fn acquisitions(&self) -> usize {
        lock(&self.state).acquisitions
    }

    pub fn foreground_requests(&self) -> usize {
        lock(&self.state).foreground_requests
    }

    pub fn background_requests(&self) -> usize {
        lock(&self.state).background_requests
    }

    pub fn last_watch_options(&self) -> Option<WatchOptions> {
        lock(&self.state).last_watch_options
    }

    pub fn live_subscriptions(&self) -> usize {
        lock(&self.subscriptions).senders.len()
    }

    pub fn max_live_subscriptions(&self) -> usize {
        lock(&self.subscriptions).max_live
    }

    pub fn emit(&self, position: Position) {
        for sender in lock(&self.subscriptions).senders.values() {
            let _ = sender.send(position.clone());
        }
    }
}

#[async_trait]
impl LocationProvider for FakeLocationProvider {
    fn platform(&self) -> Platform {
        lock(&self.state).platform
    }

    fn trigger_semantics(&self) -> TriggerSemantics {
        lock(&self.state).semantics
    }

    async fn request_foreground_permission(&self) -> Result<bool> {
        let mut state = lock(&self.state);
        state.foreground_requests += 1;
        Ok(state.foreground_granted)
    }

    async fn request_background_permission(&self) -> Result<bool> {
        let mut state = lock(&self.state);
        state.background_requests += 1;
        Ok(state.background_granted)
    }

    async fn current_position(&self) -> Result<Position> {
        let mut state = lock(&self.state);
        state.acquisitions += 1;
        if state.fail_acquisitions {
            return Err(anyhow!("location services disabled"));
        }
        Ok(Position {
            accuracy: Some(5.0),
            ..Position::new(12.97, 77.59, Utc::now())
        })
    }

    fn watch_position(
        &self,
        options: WatchOptions,
        updates: mpsc::UnboundedSender<Position>,
    ) -> Result<Box<dyn Subscription>> {
        lock(&self.state).last_watch_options = Some(options);

        let mut subs = lock(&self.subscriptions);
        let id = subs.next_id;
        subs.next_id += 1;
        subs.senders.insert(id, updates);
        subs.max_live = subs.max_live.max(subs.senders.len());

        Ok(Box::new(FakeSubscription {
            id,
            subscriptions: Arc::clone(&self.subscriptions),
        }))
    }
}

struct FakeSubscription {
    id: u64,
    subscriptions: Arc<Mutex<LiveSubscriptions>>,
}

impl Subscription for FakeSubscription {
    fn remove(self: Box<Self>) {
        lock(&self.subscriptions).senders.remove(&self.id);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pushes: Mutex<Vec<(LocationSample, bool)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> Vec<(LocationSample, bool)> {
        lock(&self.pushes).clone()
    }

    pub async fn wait_for(&self, count: usize) {
        for _ in 0..500 {
            if lock(&self.pushes).len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} pushes, saw {}",
            lock(&self.pushes).len()
        );
    }
}

#[async_trait]
impl LocationSink for RecordingSink {
    async fn push(&self, sample: &LocationSample, is_online: bool) {
        lock(&self.pushes).push((sample.clone(), is_online));
    }
}

pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Err(anyhow!("storage unavailable reading {key}"))
    }

    async fn set(&self, key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("storage unavailable writing {key}"))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        Err(anyhow!("storage unavailable removing {key}"))
    }
}

pub struct RecordingPresenter {
    supported: bool,
    permission: bool,
    failing: bool,
    held: bool,
    release: Notify,
    calls: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self {
            supported: true,
            permission: true,
            failing: false,
            held: false,
            release: Notify::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn deny_permission(self) -> Self {
        Self {
            permission: false,
            ..self
        }
    }

    pub fn failing(self) -> Self {
        Self {
            failing: true,
            ..self
        }
    }

    /// Permission prompts stay pending until `release_permission`.
    pub fn hold_permission(self) -> Self {
        Self { held: true, ..self }
    }

    pub fn release_permission(&self) {
        self.release.notify_one();
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: String) -> Result<()> {
        lock(&self.calls).push(call);
        if self.failing {
            return Err(anyhow!("notifications unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationPresenter for RecordingPresenter {
    fn supports_local_notifications(&self) -> bool {
        self.supported
    }

    async fn configure_channel(&self, channel: &crate::notify::ChannelSpec) -> Result<()> {
        if self.failing {
            return Err(anyhow!("cannot configure channel {}", channel.id));
        }
        Ok(())
    }

    async fn ensure_permission(&self) -> Result<bool> {
        if self.held {
            self.release.notified().await;
        }
        Ok(self.permission)
    }

    async fn show(&self, id: &str, _title: &str, _body: &str) -> Result<()> {
        self.record(format!("show:{id}"))
    }

    async fn dismiss(&self, id: &str) -> Result<()> {
        self.record(format!("dismiss:{id}"))
    }
}
