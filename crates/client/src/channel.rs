//! Persistent status push channel.
//!
//! [`PushChannel`] owns one background task that connects to the status
//! WebSocket, dispatches every frame to the registered handlers, and
//! reconnects with backoff when the connection drops. The task runs
//! from [`connect`](PushChannel::connect) until
//! [`disconnect`](PushChannel::disconnect) or until the channel is
//! dropped.
//!
//! Handlers are independent of the connection: they can be registered
//! before connecting, survive reconnects, and are removed when their
//! [`Subscription`] is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use exphub_core::job::JobStatusUpdate;

use crate::client::PushClient;
use crate::config::ClientConfig;
use crate::handlers::{HandlerRegistry, Subscription};
use crate::processor::{process_messages, StreamEnd};
use crate::reconnect::{reconnect_loop, ReconnectConfig};

/// How long `disconnect` waits for the connection task to wind down.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// State writer owned by one connection task.
///
/// Each `connect` starts a new generation and each `disconnect` ends it.
/// A task whose generation is no longer current cannot change the
/// published state, so a slow task from an earlier connect never
/// overwrites the state of its successor.
struct StatePublisher {
    tx: Arc<watch::Sender<ConnectionState>>,
    current: Arc<AtomicU64>,
    generation: u64,
}

impl StatePublisher {
    /// Returns `false` if this publisher's generation has ended.
    fn publish(&self, state: ConnectionState) -> bool {
        let mut accepted = false;
        // Checked under the watch lock, where generations are bumped.
        self.tx.send_if_modified(|value| {
            if self.current.load(Ordering::SeqCst) != self.generation {
                return false;
            }
            accepted = true;
            if *value == state {
                return false;
            }
            *value = state;
            true
        });
        accepted
    }
}

/// Client side of the job-status push channel.
pub struct PushChannel {
    client: PushClient,
    reconnect: ReconnectConfig,
    registry: Arc<HandlerRegistry>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    generation: Arc<AtomicU64>,
    task: Mutex<Option<RunningTask>>,
}

impl PushChannel {
    pub fn new(client: PushClient, reconnect: ReconnectConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            client,
            reconnect,
            registry: HandlerRegistry::new(),
            state_tx: Arc::new(state_tx),
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(PushClient::new(config.ws_url.clone()), config.reconnect.clone())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Observe connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Register `handler` for updates on `channel`.
    ///
    /// The handler runs on the connection task and must not block.
    pub fn register_handler<F>(&self, channel: &str, handler: F) -> Subscription
    where
        F: Fn(&JobStatusUpdate) + Send + Sync + 'static,
    {
        self.registry.register(channel, handler)
    }

    /// Number of registered handlers across all channels.
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Start the connection task if it is not already running.
    ///
    /// Calling this while connecting or connected does nothing. Must be
    /// called from within a Tokio runtime.
    pub fn connect(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = task.as_ref() {
            if !running.handle.is_finished() {
                tracing::debug!("Status channel already running, connect ignored");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let publisher = self.begin_generation();

        let client = self.client.clone();
        let reconnect = self.reconnect.clone();
        let registry = Arc::clone(&self.registry);
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            run_connection_loop(&client, &reconnect, &registry, &publisher, &task_cancel).await;
            publisher.publish(ConnectionState::Disconnected);
            tracing::info!(
                url = %client.ws_url(),
                generation = publisher.generation,
                "Status channel task exited",
            );
        });

        *task = Some(RunningTask { cancel, handle });
    }

    /// Stop the connection task. Safe to call in any state.
    pub async fn disconnect(&self) {
        let running = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.end_generation();

        if let Some(mut running) = running {
            tracing::info!(url = %self.client.ws_url(), "Disconnecting status channel");
            running.cancel.cancel();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut running.handle)
                .await
                .is_err()
            {
                tracing::warn!("Status channel task did not stop in time, aborting it");
                running.handle.abort();
            }
        }
    }

    /// Start a new generation in the `Connecting` state and return its
    /// publisher.
    fn begin_generation(&self) -> StatePublisher {
        let mut generation = 0;
        self.state_tx.send_modify(|value| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *value = ConnectionState::Connecting;
        });
        StatePublisher {
            tx: Arc::clone(&self.state_tx),
            current: Arc::clone(&self.generation),
            generation,
        }
    }

    /// Retire the current generation and publish `Disconnected`.
    fn end_generation(&self) {
        self.state_tx.send_modify(|value| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *value = ConnectionState::Disconnected;
        });
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = task.take() {
            running.cancel.cancel();
        }
    }
}

/// Connect, process frames, and reconnect until cancelled.
async fn run_connection_loop(
    client: &PushClient,
    reconnect: &ReconnectConfig,
    registry: &HandlerRegistry,
    state: &StatePublisher,
    cancel: &CancellationToken,
) {
    let first = tokio::select! {
        _ = cancel.cancelled() => return,
        result = client.connect() => result,
    };

    let mut conn = match first {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "Connection failed, entering reconnect loop");
            match reconnect_loop(client, reconnect, cancel).await {
                Some(conn) => conn,
                None => return,
            }
        }
    };

    loop {
        state.publish(ConnectionState::Connected);

        let end = process_messages(&mut conn.ws_stream, &conn.connection_id, registry, cancel).await;

        if end == StreamEnd::Cancelled || cancel.is_cancelled() {
            if let Err(e) = conn.ws_stream.close(None).await {
                tracing::debug!(error = %e, "Error closing status channel");
            }
            return;
        }

        state.publish(ConnectionState::Connecting);
        tracing::info!(
            connection_id = %conn.connection_id,
            ?end,
            "Connection lost, entering reconnect loop",
        );
        match reconnect_loop(client, reconnect, cancel).await {
            Some(next) => conn = next,
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> PushChannel {
        PushChannel::new(
            PushClient::new("ws://127.0.0.1:9".to_string()),
            ReconnectConfig::default(),
        )
    }

    #[test]
    fn current_generation_publishes() {
        let channel = channel();
        let publisher = channel.begin_generation();
        assert_eq!(channel.state(), ConnectionState::Connecting);

        assert!(publisher.publish(ConnectionState::Connected));
        assert_eq!(channel.state(), ConnectionState::Connected);
    }

    #[test]
    fn retired_generation_cannot_overwrite_successor() {
        let channel = channel();
        let stale = channel.begin_generation();
        channel.end_generation();
        assert_eq!(channel.state(), ConnectionState::Disconnected);

        let fresh = channel.begin_generation();
        assert!(fresh.publish(ConnectionState::Connected));

        assert!(!stale.publish(ConnectionState::Disconnected));
        assert!(!stale.publish(ConnectionState::Connecting));
        assert_eq!(channel.state(), ConnectionState::Connected);
    }

    #[test]
    fn ended_generation_stays_disconnected() {
        let channel = channel();
        let publisher = channel.begin_generation();
        channel.end_generation();

        assert!(!publisher.publish(ConnectionState::Connected));
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }
}
