pub mod lifecycle;
pub mod location;
pub mod presence;

pub use lifecycle::{AppExecutionState, LifecycleObservation};
pub use location::{LocationSample, Position};
pub use presence::PresenceState;
