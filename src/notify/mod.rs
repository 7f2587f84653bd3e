//! Persistent "you are online" indicator shown through the host's local
//! notification presenter.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const ONLINE_NOTIFICATION_ID: &str = "online-status-notification";
pub const ONLINE_NOTIFICATION_TITLE: &str = "You are Online";
pub const ONLINE_NOTIFICATION_BODY: &str = "You are visible to customers looking for services";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelImportance {
    Low,
    Default,
    High,
}

/// Notification channel description for hosts that group notifications
/// (Android). Hosts without channels ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub importance: ChannelImportance,
    pub show_badge: bool,
}

pub const ONLINE_STATUS_CHANNEL: ChannelSpec = ChannelSpec {
    id: "online-status",
    name: "Online Status",
    importance: ChannelImportance::Low,
    show_badge: false,
};

#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    /// Queried once when the indicator is built.
    fn supports_local_notifications(&self) -> bool;

    async fn configure_channel(&self, _channel: &ChannelSpec) -> Result<()> {
        Ok(())
    }

    /// Returns whether the user allows notifications, prompting if needed.
    async fn ensure_permission(&self) -> Result<bool>;

    async fn show(&self, id: &str, title: &str, body: &str) -> Result<()>;

    async fn dismiss(&self, id: &str) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct OnlineIndicator {
    presenter: Option<Arc<dyn NotificationPresenter>>,
}

impl OnlineIndicator {
    pub fn new(presenter: Arc<dyn NotificationPresenter>) -> Self {
        if presenter.supports_local_notifications() {
            Self {
                presenter: Some(presenter),
            }
        } else {
            log_info!("Local notifications unsupported on this host; online indicator disabled");
            Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self { presenter: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.presenter.is_some()
    }

    pub async fn prepare(&self) {
        let Some(presenter) = &self.presenter else {
            return;
        };

        if let Err(err) = presenter.configure_channel(&ONLINE_STATUS_CHANNEL).await {
            log_warn!("Failed to configure notification channel: {err:?}");
        }
    }

    /// Best-effort: show while online, dismiss otherwise. Never fails.
    pub async fn sync(&self, is_online: bool) {
        let Some(presenter) = &self.presenter else {
            return;
        };

        let result = if is_online {
            show_online(presenter.as_ref()).await
        } else {
            presenter.dismiss(ONLINE_NOTIFICATION_ID).await
        };

        if let Err(err) = result {
            log_warn!("Online indicator update failed (online={is_online}): {err:?}");
        }
    }
}

async fn show_online(presenter: &dyn NotificationPresenter) -> Result<()> {
    if !presenter.ensure_permission().await? {
        log_debug!("Notification permission not granted; skipping online indicator");
        return Ok(());
    }

    presenter.dismiss(ONLINE_NOTIFICATION_ID).await?;
    presenter
        .show(
            ONLINE_NOTIFICATION_ID,
            ONLINE_NOTIFICATION_TITLE,
            ONLINE_NOTIFICATION_BODY,
        )
        .await
}

/// Presenter for hosts that print notifications to the log instead of the
/// system tray.
pub struct LogPresenter;

#[async_trait]
impl NotificationPresenter for LogPresenter {
    fn supports_local_notifications(&self) -> bool {
        true
    }

    async fn ensure_permission(&self) -> Result<bool> {
        Ok(true)
    }

    async fn show(&self, id: &str, title: &str, body: &str) -> Result<()> {
        log::info!("[notification:{id}] {title}: {body}");
        Ok(())
    }

    async fn dismiss(&self, id: &str) -> Result<()> {
        log::debug!("[notification:{id}] dismissed");
        Ok(())
    }
}
