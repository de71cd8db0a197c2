//! ExperimentHub client library.
//!
//! Provides the REST API wrappers, the job-status WebSocket push channel
//! with handler subscriptions and reconnection, the bridge that feeds
//! pushed updates into the core store, and the dashboard controller that
//! ties them together.

pub mod api;
pub mod channel;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod handlers;
pub mod messages;
pub mod notices;
pub mod processor;
pub mod reconnect;
pub mod service;
pub mod sync;
