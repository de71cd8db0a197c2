//! Push channel frame types and parser.
//!
//! The status server sends JSON text frames in one of two shapes:
//!
//! - an envelope naming the logical channel:
//!   `{"channel": "global", "data": {"job_id": "...", "epoch": 3}}`
//! - a bare status update, which belongs to [`GLOBAL_CHANNEL`]:
//!   `{"job_id": "...", "epoch": 3}`

use serde::Deserialize;

use exphub_core::job::JobStatusUpdate;

use crate::client::ChannelError;

/// The logical channel carrying status updates for every job.
pub const GLOBAL_CHANNEL: &str = "global";

/// A parsed push frame routed to a logical channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub channel: String,
    pub update: JobStatusUpdate,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Frame {
    Envelope {
        channel: String,
        data: JobStatusUpdate,
    },
    Bare(JobStatusUpdate),
}

/// Parse a push channel text frame.
///
/// Returns `Err` for malformed JSON or non-object payloads. Callers
/// should log the failure and continue with the next frame.
pub fn parse_message(text: &str) -> Result<PushMessage, ChannelError> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| ChannelError::Protocol(e.to_string()))?;
    Ok(match frame {
        Frame::Envelope { channel, data } => PushMessage {
            channel,
            update: data,
        },
        Frame::Bare(update) => PushMessage {
            channel: GLOBAL_CHANNEL.to_string(),
            update,
        },
    })
}
