use chrono::{DateTime, Utc};

use crate::{models::Position, platform::WatchOptions};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Local rate limiter that admits a fix when the interval OR the displacement
/// threshold has been crossed since the last admitted fix. Used when the
/// platform can only combine its own thresholds with AND.
#[derive(Debug, Clone)]
pub struct MovementGate {
    options: WatchOptions,
    last: Option<(DateTime<Utc>, f64, f64)>,
}

impl MovementGate {
    pub fn new(options: WatchOptions) -> Self {
        Self {
            options,
            last: None,
        }
    }

    pub fn admit(&mut self, position: &Position) -> bool {
        let admitted = match self.last {
            None => true,
            Some((at, lat, lon)) => {
                let elapsed = (position.timestamp - at).to_std().unwrap_or_default();
                elapsed >= self.options.min_interval
                    || distance_m(lat, lon, position.latitude, position.longitude)
                        >= self.options.min_distance_m
            }
        };

        if admitted {
            self.last = Some((position.timestamp, position.latitude, position.longitude));
        }
        admitted
    }
}

/// Great-circle distance in meters (haversine).
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
