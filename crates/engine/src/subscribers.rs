use events::RawEvent;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback = Arc<dyn Fn(&RawEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

/// The set of consumers that receive every raw event as it arrives.
///
/// Cloning yields another handle to the same set.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` and returns the token that removes it again.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RawEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = lock(&self.inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.callbacks.insert(id, Arc::new(callback));
        tracing::debug!(subscriber = id, total = registry.callbacks.len(), "Subscriber registered.");

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every subscriber registered when the pass began.
    ///
    /// The lock is not held while callbacks run, so a callback may subscribe or
    /// unsubscribe (itself included). Subscribers added during the pass are
    /// skipped; subscribers removed during the pass are skipped if not yet
    /// visited. A failing or panicking callback is logged and the pass goes on.
    ///
    /// Returns the number of callbacks that completed successfully.
    pub fn publish(&self, event: &RawEvent) -> usize {
        let snapshot: Vec<(u64, Callback)> = lock(&self.inner)
            .callbacks
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut delivered = 0;
        for (id, callback) in snapshot {
            if !lock(&self.inner).callbacks.contains_key(&id) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::error!(subscriber = id, error = ?e, "Subscriber failed to handle event.");
                }
                Err(_) => {
                    tracing::error!(subscriber = id, "Subscriber panicked while handling event.");
                }
            }
        }
        delivered
    }
}

/// Capability token returned by [`SubscriberRegistry::subscribe`].
///
/// Dropping the token leaves the subscription in place; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the callback. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = lock(&registry).callbacks.remove(&self.id).is_some();
        if removed {
            tracing::debug!(subscriber = self.id, "Subscriber removed.");
        }
        removed
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
