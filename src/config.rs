use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Coordinates {
    fn default() -> Self {
        Self {
            latitude: 12.97,
            longitude: 77.59,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend_url: String,
    pub location_path: String,
    pub request_timeout_secs: u64,
    pub inactivity_timeout_secs: u64,
    pub heartbeat_secs: u64,
    pub continuous_interval_secs: u64,
    pub continuous_distance_m: f64,
    pub periodic_interval_secs: u64,
    pub acquisition_timeout_secs: u64,
    pub store_path: PathBuf,
    pub simulated_origin: Coordinates,
    /// Not read from disk; set from `GENIE_SESSION_TOKEN`.
    #[serde(skip)]
    pub session_token: Option<String>,
    #[serde(skip)]
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            location_path: "/agent/location".into(),
            request_timeout_secs: 30,
            inactivity_timeout_secs: 30 * 60,
            heartbeat_secs: 60,
            continuous_interval_secs: 5,
            continuous_distance_m: 10.0,
            periodic_interval_secs: 5 * 60,
            acquisition_timeout_secs: 15,
            store_path: PathBuf::from("genie-presence.sqlite3"),
            simulated_origin: Coordinates::default(),
            session_token: None,
            debug: false,
        }
    }
}

impl EngineConfig {
    /// Reads the JSON config at `path` if present, then applies env overrides.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                serde_json::from_str(&contents).unwrap_or_else(|err| {
                    warn!("Ignoring malformed config {}: {err}", path.display());
                    EngineConfig::default()
                })
            }
            _ => EngineConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GENIE_BACKEND_URL").filter(|v| !v.is_empty()) {
            self.backend_url = url;
        }
        if let Some(token) = lookup("GENIE_SESSION_TOKEN").filter(|v| !v.is_empty()) {
            self.session_token = Some(token);
        }
        self.debug = lookup("GENIE_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
    }

    pub fn location_endpoint(&self) -> String {
        format!(
            "{}/api{}",
            self.backend_url.trim_end_matches('/'),
            self.location_path
        )
    }

    /// Values past chrono's range clamp to the longest representable timeout.
    pub fn inactivity_timeout(&self) -> chrono::Duration {
        i64::try_from(self.inactivity_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sampler_settings(&self) -> crate::tracking::SamplerSettings {
        crate::tracking::SamplerSettings {
            continuous_interval: Duration::from_secs(self.continuous_interval_secs),
            continuous_distance_m: self.continuous_distance_m,
            periodic_interval: Duration::from_secs(self.periodic_interval_secs.max(1)),
            acquisition_timeout: Duration::from_secs(self.acquisition_timeout_secs.max(1)),
        }
    }
}
