#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire value of the activity type carrying user-visible text.
pub const ACTIVITY_TYPE_MESSAGE: &str = "message";

/// Identity of a message sender or recipient on the relay channel.
///
/// The `id` for activities posted by this client is created locally and sent
/// with every message, so the bot must not trust it for anything
/// security-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A single unit of conversational content exchanged with the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Activity {
    /// Build an outbound message activity from one line of operator input.
    #[must_use]
    pub fn message(from_user: &str, text: &str) -> Self {
        Self {
            activity_type: ACTIVITY_TYPE_MESSAGE.to_string(),
            id: None,
            from: Some(ChannelAccount {
                id: from_user.to_string(),
                name: None,
            }),
            text: Some(text.to_string()),
            timestamp: None,
        }
    }

    /// Whether this activity is a user-visible text message.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.activity_type == ACTIVITY_TYPE_MESSAGE
    }

    /// Sender identifier, if the service included one.
    #[must_use]
    pub fn sender_id(&self) -> Option<&str> {
        self.from.as_ref().map(|account| account.id.as_str())
    }
}

/// An ordered batch of activities delivered by the streaming transport.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivitySet {
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub watermark: Option<String>,
}

/// Result of minting a token for a brand-new conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
    pub token: String,
    pub expires_in: Option<u64>,
}

/// A server-side conversation plus the credential scoped to it.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    pub token: String,
    #[serde(rename = "streamUrl")]
    pub stream_url: Option<String>,
    pub expires_in: Option<u64>,
}

/// A bootstrapped conversation session.
///
/// Exactly one session is active per process run. It is created by the
/// bootstrapper, immutable afterwards, and consumed by the relay loop.
#[derive(Debug, Clone)]
pub struct Session {
    pub conversation_id: String,
    pub token: String,
    pub stream_url: Option<String>,
    pub watermark: Option<String>,
}

impl Session {
    /// Wrap a conversation returned by the relay service.
    #[must_use]
    pub fn from_conversation(conversation: Conversation) -> Self {
        Self {
            conversation_id: conversation.conversation_id,
            token: conversation.token,
            stream_url: conversation.stream_url,
            watermark: None,
        }
    }

    /// Retain an operator-supplied watermark for history replay.
    #[must_use]
    pub fn with_watermark(mut self, watermark: Option<String>) -> Self {
        self.watermark = watermark;
        self
    }
}

/// Operations of the external conversation-relay service.
///
/// The relay loop and bootstrapper are generic over this trait so tests can
/// substitute an in-memory implementation.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Mint a short-lived token scoped to a brand-new conversation.
    async fn generate_token(&self) -> anyhow::Result<TokenResponse>;

    /// Start a conversation using a previously minted token.
    async fn start_conversation(&self, token: &str) -> anyhow::Result<Conversation>;

    /// Reconnect to an existing conversation by identifier.
    async fn reconnect(
        &self,
        conversation_id: &str,
        watermark: Option<&str>,
    ) -> anyhow::Result<Conversation>;

    /// Fetch activities after the given watermark (history replay).
    async fn activities_after(
        &self,
        conversation_id: &str,
        watermark: Option<&str>,
    ) -> anyhow::Result<ActivitySet>;

    /// Post one activity to the conversation, returning its server id.
    async fn post_activity(
        &self,
        conversation_id: &str,
        activity: &Activity,
    ) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_message_shape() -> Result<(), serde_json::Error> {
        let activity = Activity::message("console user", "hello bot");

        assert!(activity.is_message());
        assert_eq!(activity.sender_id(), Some("console user"));

        let wire = serde_json::to_value(&activity)?;
        assert_eq!(wire["type"], "message");
        assert_eq!(wire["from"]["id"], "console user");
        assert_eq!(wire["text"], "hello bot");
        // Unset optionals must not appear on the wire
        assert!(wire.get("id").is_none());
        assert!(wire.get("timestamp").is_none());
        Ok(())
    }

    #[test]
    fn test_activity_set_wire_format() -> Result<(), serde_json::Error> {
        let payload = r#"{
            "activities": [
                {"type": "message", "id": "C1|0001", "from": {"id": "echobot"}, "text": "Hi there"},
                {"type": "typing", "from": {"id": "echobot"}}
            ],
            "watermark": "5"
        }"#;

        let batch: ActivitySet = serde_json::from_str(payload)?;
        assert_eq!(batch.activities.len(), 2);
        assert_eq!(batch.watermark.as_deref(), Some("5"));
        assert!(batch.activities[0].is_message());
        assert!(!batch.activities[1].is_message());
        assert_eq!(batch.activities[0].text.as_deref(), Some("Hi there"));
        Ok(())
    }

    #[test]
    fn test_activity_set_missing_activities_defaults_empty() -> Result<(), serde_json::Error> {
        let batch: ActivitySet = serde_json::from_str(r#"{"watermark": "0"}"#)?;
        assert!(batch.activities.is_empty());
        Ok(())
    }

    #[test]
    fn test_conversation_wire_format() -> Result<(), serde_json::Error> {
        let payload = r#"{
            "conversationId": "C2",
            "token": "tok",
            "streamUrl": "wss://example.test/stream",
            "expires_in": 1800
        }"#;

        let conversation: Conversation = serde_json::from_str(payload)?;
        assert_eq!(conversation.conversation_id, "C2");
        assert_eq!(conversation.expires_in, Some(1800));

        let session = Session::from_conversation(conversation).with_watermark(Some("5".into()));
        assert_eq!(session.conversation_id, "C2");
        assert_eq!(session.watermark.as_deref(), Some("5"));
        assert_eq!(
            session.stream_url.as_deref(),
            Some("wss://example.test/stream")
        );
        Ok(())
    }
}
