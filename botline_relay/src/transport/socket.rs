use super::{Transport, forward_frames};
use crate::{Error, Result};
use async_trait::async_trait;
use botline_core::{ActivitySet, Session};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::Connector;
use tracing::info;

/// Raw streaming: dial the session's stream URL directly.
///
/// The relay endpoint rejects handshakes below TLS 1.2, so the connector
/// is built with an explicit protocol floor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketTransport;

impl SocketTransport {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn connect(&self, session: &Session) -> Result<mpsc::Receiver<ActivitySet>> {
        let stream_url = session.stream_url.as_deref().ok_or(Error::MissingStreamUrl)?;

        info!(
            "Connecting raw WebSocket for conversation {}",
            session.conversation_id
        );

        let connector = Connector::Rustls(Arc::new(tls_config()?));
        let (ws_stream, _) = tokio_tungstenite::connect_async_tls_with_config(
            stream_url,
            None,
            false,
            Some(connector),
        )
        .await?;
        info!("Streaming connection established");

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(forward_frames(ws_stream, tx));

        Ok(rx)
    }
}

/// Client TLS config accepting TLS 1.2 as the minimum protocol version.
fn tls_config() -> Result<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()));

    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_config_builds() {
        let config = tls_config().expect("protocol versions are supported");
        assert!(!config.crypto_provider().cipher_suites.is_empty());
    }
}
