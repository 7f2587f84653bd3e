pub mod monitor;
pub mod state;

pub use monitor::{EngineStatus, LifecycleMonitor, MonitorSettings};
pub use state::{LifecyclePhase, LifecycleTracker, Transition};
