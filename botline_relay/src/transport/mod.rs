//! Streaming transports delivering inbound activity batches.
//!
//! Both transports feed the same loop: they decode WebSocket frames into
//! [`ActivitySet`] batches and push them through an mpsc channel. They
//! differ only in how the socket is obtained. The callback transport lets
//! the relay service hand out a fresh stream endpoint, while the raw
//! socket transport dials the session's stream URL directly.

mod callback;
mod socket;

pub use callback::CallbackTransport;
pub use socket::SocketTransport;

use crate::{Error, Result};
use async_trait::async_trait;
use botline_core::{ActivitySet, Session};
use futures_util::{Stream, StreamExt};
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

/// Inbound half of the duplex channel.
///
/// Establishment completes before the input loop starts, so the operator
/// sees the connected confirmation before typing.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, session: &Session) -> Result<mpsc::Receiver<ActivitySet>>;
}

/// Which transport implementation a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Callback,
    Socket,
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "callback" => Ok(Self::Callback),
            "socket" => Ok(Self::Socket),
            other => Err(Error::Config(format!(
                "Unknown transport \"{other}\" (expected \"callback\" or \"socket\")"
            ))),
        }
    }
}

/// Decode one text frame from the streaming socket.
///
/// An empty or whitespace-only payload is a liveness ping, discarded
/// without parsing. Anything else must be an activity batch.
pub(crate) fn decode_frame(
    payload: &str,
) -> std::result::Result<Option<ActivitySet>, serde_json::Error> {
    if payload.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(payload).map(Some)
}

/// Pump frames from a socket into the batch channel until either side ends.
///
/// Malformed payloads are reported and skipped; the stream stays up.
pub(crate) async fn forward_frames<S>(mut stream: S, tx: mpsc::Sender<ActivitySet>)
where
    S: Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Streaming transport error: {e}");
                break;
            }
        };

        match decode_frame(&text) {
            Ok(Some(batch)) => {
                if tx.send(batch).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping malformed inbound payload: {e}"),
        }
    }
}
