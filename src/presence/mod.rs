pub mod holder;

pub use holder::PresenceStateHolder;
