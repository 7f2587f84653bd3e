use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PresenceState {
    pub is_online: bool,
    /// `None` until some activity has been recorded on this install.
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl PresenceState {
    pub fn offline() -> Self {
        Self::default()
    }

    /// An online flag whose last corroborating activity is older than `timeout`
    /// (or unknown) must not be trusted.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        if !self.is_online {
            return false;
        }

        match self.last_activity_at {
            Some(last) => now - last > timeout,
            None => true,
        }
    }
}
