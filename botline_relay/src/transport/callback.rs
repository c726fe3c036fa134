use super::{Transport, forward_frames};
use crate::{Error, Result};
use async_trait::async_trait;
use botline_core::{ActivitySet, RelayApi, Session};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Managed streaming: the relay service hands out a fresh stream endpoint
/// (and token) via its reconnect operation, and this transport owns the
/// socket task behind it.
pub struct CallbackTransport {
    api: Arc<dyn RelayApi>,
}

impl CallbackTransport {
    #[must_use]
    pub fn new(api: Arc<dyn RelayApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Transport for CallbackTransport {
    async fn connect(&self, session: &Session) -> Result<mpsc::Receiver<ActivitySet>> {
        info!(
            "Requesting stream endpoint for conversation {}",
            session.conversation_id
        );

        let conversation = self
            .api
            .reconnect(&session.conversation_id, session.watermark.as_deref())
            .await
            .map_err(Error::Relay)?;

        let stream_url = conversation.stream_url.ok_or(Error::MissingStreamUrl)?;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&stream_url).await?;
        info!("Streaming connection established");

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(forward_frames(ws_stream, tx));

        Ok(rx)
    }
}
