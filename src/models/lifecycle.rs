use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AppExecutionState {
    Active,
    Inactive,
    Background,
}

impl Default for AppExecutionState {
    fn default() -> Self {
        AppExecutionState::Active
    }
}

impl AppExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppExecutionState::Active => "active",
            AppExecutionState::Inactive => "inactive",
            AppExecutionState::Background => "background",
        }
    }

    pub fn is_foreground(&self) -> bool {
        matches!(self, AppExecutionState::Active)
    }
}

impl std::str::FromStr for AppExecutionState {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(AppExecutionState::Active),
            "inactive" => Ok(AppExecutionState::Inactive),
            "background" => Ok(AppExecutionState::Background),
            other => Err(anyhow::anyhow!("unknown app state '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleObservation {
    pub state: AppExecutionState,
    pub transitioned_at: DateTime<Utc>,
}
