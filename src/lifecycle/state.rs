use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{AppExecutionState, LifecycleObservation};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LifecyclePhase {
    Active,
    /// Transient interruption (incoming call, app switcher); treated like
    /// background for timeout purposes.
    Backgrounding,
    Background,
}

impl From<AppExecutionState> for LifecyclePhase {
    fn from(state: AppExecutionState) -> Self {
        match state {
            AppExecutionState::Active => LifecyclePhase::Active,
            AppExecutionState::Inactive => LifecyclePhase::Backgrounding,
            AppExecutionState::Background => LifecyclePhase::Background,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EnteredBackground,
    /// `away` is `None` when the app has not been seen leaving the foreground
    /// in this process (e.g. it launched straight into background).
    ReturnedToForeground { away: Option<Duration> },
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct LifecycleTracker {
    phase: LifecyclePhase,
    backgrounded_at: Option<DateTime<Utc>>,
}

impl LifecycleTracker {
    pub fn new(initial: AppExecutionState) -> Self {
        Self {
            phase: initial.into(),
            backgrounded_at: None,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn backgrounded_at(&self) -> Option<DateTime<Utc>> {
        self.backgrounded_at
    }

    pub fn observe(&mut self, observation: LifecycleObservation) -> Transition {
        let next = LifecyclePhase::from(observation.state);
        let previous = std::mem::replace(&mut self.phase, next);

        match (previous, next) {
            (LifecyclePhase::Active, LifecyclePhase::Backgrounding | LifecyclePhase::Background) => {
                self.backgrounded_at = Some(observation.transitioned_at);
                Transition::EnteredBackground
            }
            (LifecyclePhase::Backgrounding | LifecyclePhase::Background, LifecyclePhase::Active) => {
                let away = self
                    .backgrounded_at
                    .take()
                    .map(|since| observation.transitioned_at - since);
                Transition::ReturnedToForeground { away }
            }
            _ => Transition::Unchanged,
        }
    }
}
