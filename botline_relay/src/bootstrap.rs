//! Session bootstrapping: start a fresh conversation or resume one by id.
//!
//! Both paths end up holding a conversation identifier and a token scoped
//! to that conversation. Any relay-service failure is fatal for the run;
//! a failed resume never returns a partially populated session.

use crate::{Error, Result};
use botline_core::{RelayApi, Session};
use tracing::info;

/// Produces the single [`Session`] a run operates on.
pub struct SessionBootstrapper<A> {
    api: A,
}

impl<A> SessionBootstrapper<A>
where
    A: RelayApi,
{
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    /// Start a brand-new conversation: issue a token, then start a
    /// conversation with it.
    pub async fn start_new(&self) -> Result<Session> {
        let minted = self.api.generate_token().await.map_err(Error::Relay)?;

        let conversation = self
            .api
            .start_conversation(&minted.token)
            .await
            .map_err(Error::Relay)?;

        info!("Started conversation {}", conversation.conversation_id);

        Ok(Session::from_conversation(conversation))
    }

    /// Resume an existing conversation by identifier.
    ///
    /// A supplied watermark is retained on the session for history replay;
    /// the loop replays the backlog only when one was given.
    pub async fn resume(&self, conversation_id: &str, watermark: Option<&str>) -> Result<Session> {
        let conversation = self
            .api
            .reconnect(conversation_id, watermark)
            .await
            .map_err(Error::Relay)?;

        info!("Reconnected to conversation {}", conversation.conversation_id);

        Ok(Session::from_conversation(conversation)
            .with_watermark(watermark.map(ToString::to_string)))
    }
}
