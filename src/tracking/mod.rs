pub mod gate;
pub mod sampler;
mod worker;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use gate::MovementGate;
pub use sampler::LocationSampler;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackingMode {
    /// Online: platform stream, 5 s or 10 m, whichever comes first.
    Continuous,
    /// Offline: one fix every 5 minutes.
    Periodic,
}

impl TrackingMode {
    pub fn for_presence(is_online: bool) -> Self {
        if is_online {
            TrackingMode::Continuous
        } else {
            TrackingMode::Periodic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::Continuous => "continuous",
            TrackingMode::Periodic => "periodic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    pub continuous_interval: Duration,
    pub continuous_distance_m: f64,
    pub periodic_interval: Duration,
    pub acquisition_timeout: Duration,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            continuous_interval: Duration::from_secs(5),
            continuous_distance_m: 10.0,
            periodic_interval: Duration::from_secs(5 * 60),
            acquisition_timeout: Duration::from_secs(15),
        }
    }
}
