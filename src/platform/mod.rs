//! Host-supplied collaborators. Each one is a trait so the engine can run
//! against a real mobile runtime, the simulated host, or test doubles.

pub mod clock;
pub mod lifecycle;
pub mod location;

pub use clock::{Clock, SystemClock};
pub use lifecycle::{HostLifecycle, LifecyclePort};
pub use location::{LocationProvider, Platform, TriggerSemantics, WatchOptions};

/// Handle returned by every `subscribe`/`watch` call on a port. Dropping the
/// box without calling `remove` leaks the platform subscription.
pub trait Subscription: Send + Sync {
    fn remove(self: Box<Self>);
}
