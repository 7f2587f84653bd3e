use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::mpsc;

use crate::models::AppExecutionState;

use super::Subscription;

pub trait LifecyclePort: Send + Sync {
    fn current_state(&self) -> AppExecutionState;

    fn subscribe(&self, events: mpsc::UnboundedSender<AppExecutionState>) -> Box<dyn Subscription>;
}

#[derive(Default)]
struct Listeners {
    current: AppExecutionState,
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<AppExecutionState>>,
}

/// Lifecycle port fed by the embedding host: the host calls [`notify`] from
/// its own app-state callback and the engine sees it as a transition event.
///
/// [`notify`]: HostLifecycle::notify
#[derive(Clone, Default)]
pub struct HostLifecycle {
    listeners: Arc<Mutex<Listeners>>,
}

impl HostLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn notify(&self, state: AppExecutionState) {
        let mut guard = self.listeners();
        guard.current = state;
        guard.senders.retain(|_, tx| tx.send(state).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners().senders.len()
    }
}

impl LifecyclePort for HostLifecycle {
    fn current_state(&self) -> AppExecutionState {
        self.listeners().current
    }

    fn subscribe(&self, events: mpsc::UnboundedSender<AppExecutionState>) -> Box<dyn Subscription> {
        let mut guard = self.listeners();
        let id = guard.next_id;
        guard.next_id += 1;
        guard.senders.insert(id, events);

        Box::new(HostLifecycleSubscription {
            id,
            listeners: Arc::clone(&self.listeners),
        })
    }
}

struct HostLifecycleSubscription {
    id: u64,
    listeners: Arc<Mutex<Listeners>>,
}

impl Subscription for HostLifecycleSubscription {
    fn remove(self: Box<Self>) {
        let mut guard = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.senders.remove(&self.id);
    }
}
