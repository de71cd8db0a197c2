//! Backoff schedule and retry loop for the status push channel.
//!
//! After a drop the channel task waits, retries, and doubles the wait
//! (capped) after every failure. [`Backoff`] owns that schedule;
//! [`retry_with_backoff`] drives any fallible async connect against it
//! and gives up only when the [`CancellationToken`] fires.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{PushClient, PushConnection};

/// Backoff tuning, loaded from `EXPHUB_RECONNECT_*`.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Cap on the wait between retries.
    pub max_delay: Duration,
    /// Growth factor applied after each failed retry.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Position in a backoff schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    upcoming: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            upcoming: config.initial_delay.min(config.max_delay),
            config,
            attempts: 0,
        }
    }

    /// Take the wait before the next attempt and advance the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.upcoming;
        let scaled_ms = (delay.as_millis() as f64 * self.config.multiplier) as u64;
        self.upcoming = Duration::from_millis(scaled_ms).min(self.config.max_delay);
        self.attempts += 1;
        delay
    }

    /// Attempts handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Call `connect` on the backoff schedule until it succeeds.
///
/// Every attempt is preceded by its delay, including the first. Returns
/// `None` as soon as `cancel` fires, whether waiting or connecting.
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut connect: F,
    backoff: &mut Backoff,
    cancel: &CancellationToken,
) -> Option<T>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    loop {
        let delay = backoff.next_delay();
        tracing::debug!(
            attempt = backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Waiting before reconnect",
        );

        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            outcome = async {
                tokio::time::sleep(delay).await;
                connect().await
            } => Some(outcome),
        };

        match outcome {
            None => return None,
            Some(Ok(value)) => return Some(value),
            Some(Err(e)) => {
                tracing::warn!(attempt = backoff.attempts(), error = %e, "Reconnect attempt failed");
            }
        }
    }
}

/// Reopen the push connection for `client` with a fresh backoff schedule.
pub async fn reconnect_loop(
    client: &PushClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<PushConnection> {
    let mut backoff = Backoff::new(config.clone());
    tracing::info!(url = %client.ws_url(), "Status channel reconnecting");

    let conn = retry_with_backoff(move || client.connect(), &mut backoff, cancel).await;

    match &conn {
        Some(_) => tracing::info!(
            url = %client.ws_url(),
            attempts = backoff.attempts(),
            "Status channel reconnected",
        ),
        None => tracing::info!(url = %client.ws_url(), "Status channel reconnect cancelled"),
    }
    conn
}
