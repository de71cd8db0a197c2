//! WebSocket frame processing loop.
//!
//! Reads raw frames from a push connection, parses them into
//! [`PushMessage`]s and dispatches each one to the handlers registered
//! for its channel.

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::PushStream;
use crate::handlers::HandlerRegistry;
use crate::messages::parse_message;

/// Why the processing loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server closed the connection or the stream ended.
    Closed,
    /// A receive error broke the connection.
    Failed,
    /// The cancellation token fired.
    Cancelled,
}

/// Process frames until the socket closes, fails, or `cancel` fires.
///
/// Malformed text frames are logged and skipped. Binary frames are
/// ignored.
pub async fn process_messages(
    ws_stream: &mut PushStream,
    connection_id: &str,
    registry: &HandlerRegistry,
    cancel: &CancellationToken,
) -> StreamEnd {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            next = ws_stream.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                handle_text_message(&text, connection_id, registry);
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::trace!(connection_id, "Ignoring binary frame");
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(connection_id, ?frame, "Status channel closed by server");
                return StreamEnd::Closed;
            }
            Some(Err(e)) => {
                tracing::error!(connection_id, error = %e, "Status channel receive error");
                return StreamEnd::Failed;
            }
            None => return StreamEnd::Closed,
        }
    }
}

/// Parse one text frame and hand it to the registry.
pub fn handle_text_message(text: &str, connection_id: &str, registry: &HandlerRegistry) {
    match parse_message(text) {
        Ok(msg) => {
            let delivered = registry.dispatch(&msg.channel, &msg.update);
            tracing::trace!(
                connection_id,
                channel = %msg.channel,
                job_id = %msg.update.job_id,
                delivered,
                "Dispatched status update",
            );
        }
        Err(e) => {
            tracing::warn!(
                connection_id,
                error = %e,
                raw_message = %text,
                "Failed to parse status frame",
            );
        }
    }
}
