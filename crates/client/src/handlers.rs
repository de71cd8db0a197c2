//! Handler registration for push channel messages.
//!
//! [`HandlerRegistry::register`] returns a [`Subscription`]. The handler
//! stays registered exactly as long as the subscription is alive:
//! dropping it, or calling [`Subscription::unsubscribe`], removes the
//! handler before returning, so it is never invoked afterwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use exphub_core::job::JobStatusUpdate;

/// Callback invoked for each update on a subscribed channel.
pub type Handler = Box<dyn Fn(&JobStatusUpdate) + Send + Sync>;

struct Registered {
    channel: String,
    handler: Handler,
}

/// Thread-safe table of channel handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<u64, Registered>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` for messages on `channel`.
    pub fn register<F>(self: &Arc<Self>, channel: &str, handler: F) -> Subscription
    where
        F: Fn(&JobStatusUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Registered {
                    channel: channel.to_string(),
                    handler: Box::new(handler),
                },
            );
        tracing::debug!(subscription_id = id, channel, "Handler registered");
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Invoke every handler registered for `channel`.
    ///
    /// The table stays read-locked while handlers run, so a concurrent
    /// unsubscribe waits for the dispatch to finish and the handler is
    /// never called once `Subscription::drop` has returned. Handlers
    /// must not register or drop subscriptions themselves. Returns the
    /// number of handlers invoked.
    pub fn dispatch(&self, channel: &str, update: &JobStatusUpdate) -> usize {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        for registered in handlers.values().filter(|r| r.channel == channel) {
            (registered.handler)(update);
            delivered += 1;
        }
        delivered
    }

    /// Number of live registrations across all channels.
    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        let removed = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            tracing::debug!(subscription_id = id, "Handler removed");
        }
    }
}

/// Keeps a handler registered until dropped.
#[must_use = "dropping a Subscription immediately unregisters its handler"]
pub struct Subscription {
    id: u64,
    registry: Weak<HandlerRegistry>,
}

impl Subscription {
    /// Remove the handler now. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
