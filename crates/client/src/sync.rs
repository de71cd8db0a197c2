//! Bridge from the push channel to the single-owner [`Store`].
//!
//! The channel invokes handlers on its own task, but the store has one
//! owner. [`StatusFeed`] registers a handler that forwards updates over
//! an unbounded queue; the owner then applies them with
//! [`StatusFeed::drain_into`] or [`StatusFeed::next_into`], one event at
//! a time.

use tokio::sync::mpsc;

use exphub_core::job::JobStatusUpdate;
use exphub_core::store::Store;

use crate::channel::PushChannel;
use crate::handlers::Subscription;
use crate::messages::GLOBAL_CHANNEL;

/// A live subscription feeding status updates to a store owner.
///
/// Dropping the feed unregisters its handler.
pub struct StatusFeed {
    rx: mpsc::UnboundedReceiver<JobStatusUpdate>,
    // Dropped after `rx`; keeps the forwarding handler registered.
    _subscription: Subscription,
}

impl StatusFeed {
    /// Subscribe to the `global` channel.
    pub fn subscribe(channel: &PushChannel) -> Self {
        Self::subscribe_to(channel, GLOBAL_CHANNEL)
    }

    /// Subscribe to a named logical channel.
    pub fn subscribe_to(channel: &PushChannel, name: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = channel.register_handler(name, move |update: &JobStatusUpdate| {
            if update.has_job_id() {
                // Send fails only after the feed has been dropped.
                let _ = tx.send(update.clone());
            }
        });
        Self {
            rx,
            _subscription: subscription,
        }
    }

    /// Apply every queued update without waiting. Returns how many were merged.
    pub fn drain_into(&mut self, store: &mut Store) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.rx.try_recv() {
            if store.apply_status(update) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next update, merge it, and return its job ID.
    ///
    /// Returns `None` once the originating [`PushChannel`] has been dropped.
    pub async fn next_into(&mut self, store: &mut Store) -> Option<String> {
        let update = self.rx.recv().await?;
        let job_id = update.job_id.clone();
        store.apply_status(update);
        Some(job_id)
    }

    /// Wait for the next update without applying it.
    pub async fn recv(&mut self) -> Option<JobStatusUpdate> {
        self.rx.recv().await
    }
}
