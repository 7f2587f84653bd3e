use chrono::{DateTime, Utc};

/// Wall-clock source. Inactivity checks compare wall time because the gap
/// they measure spans suspended timers and process restarts.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
