//! WebSocket client for the job-status push channel.
//!
//! [`PushClient`] holds the endpoint configuration. Call
//! [`PushClient::connect`] to open a live [`PushConnection`].

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// The raw WebSocket stream type used for push connections.
pub type PushStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration handle for the push channel endpoint.
#[derive(Debug, Clone)]
pub struct PushClient {
    ws_url: String,
}

/// A live WebSocket connection to the push channel.
pub struct PushConnection {
    /// Locally generated ID used to correlate log lines for this connection.
    pub connection_id: String,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: PushStream,
}

impl PushClient {
    /// * `ws_url` - WebSocket URL, e.g. `ws://host:8000/ws`.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open the WebSocket connection.
    pub async fn connect(&self) -> Result<PushConnection, ChannelError> {
        let connection_id = uuid::Uuid::new_v4().to_string();

        let (ws_stream, _response) = connect_async(self.ws_url.as_str()).await.map_err(|e| {
            ChannelError::Connection(format!(
                "Failed to connect to status channel at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(
            connection_id = %connection_id,
            "Connected to status channel at {}",
            self.ws_url,
        );

        Ok(PushConnection {
            connection_id,
            ws_stream,
        })
    }
}

/// Errors that can occur on the push channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A frame could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
