use async_trait::async_trait;
use botline_core::{Activity, ActivitySet, Conversation, RelayApi, TokenResponse};
use reqwest::Client;
use tracing::info;

/// Client for the relay service's REST surface.
///
/// A client is scoped to exactly one credential: the long-lived secret
/// during bootstrap, or a conversation token afterwards. Errors are
/// surfaced once at the call site; there is no retry.
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
    credential: String,
}

impl RelayClient {
    pub fn new(credential: String) -> Self {
        info!("Creating RelayClient");
        Self {
            client: Client::new(),
            base_url: "https://directline.botframework.com".to_string(),
            credential,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Derive a client scoped to a conversation token.
    ///
    /// The underlying connection pool is shared with the parent client.
    #[must_use]
    pub fn scoped(&self, token: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            credential: token.to_string(),
        }
    }

    fn conversation_url(&self, conversation_id: &str) -> String {
        format!("{}/v3/directline/conversations/{conversation_id}", self.base_url)
    }
}

#[async_trait]
impl RelayApi for RelayClient {
    async fn generate_token(&self) -> anyhow::Result<TokenResponse> {
        info!("Requesting token for a new conversation");

        let response = self
            .client
            .post(format!("{}/v3/directline/tokens/generate", self.base_url))
            .bearer_auth(&self.credential)
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?;

        Ok(response)
    }

    async fn start_conversation(&self, token: &str) -> anyhow::Result<Conversation> {
        info!("Starting a new conversation");

        let conversation = self
            .client
            .post(format!("{}/v3/directline/conversations", self.base_url))
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<Conversation>()
            .await?;

        Ok(conversation)
    }

    async fn reconnect(
        &self,
        conversation_id: &str,
        watermark: Option<&str>,
    ) -> anyhow::Result<Conversation> {
        info!("Reconnecting to conversation {conversation_id}");

        let mut request = self
            .client
            .get(self.conversation_url(conversation_id))
            .bearer_auth(&self.credential);
        if let Some(watermark) = watermark {
            request = request.query(&[("watermark", watermark)]);
        }

        let conversation = request
            .send()
            .await?
            .error_for_status()?
            .json::<Conversation>()
            .await?;

        Ok(conversation)
    }

    async fn activities_after(
        &self,
        conversation_id: &str,
        watermark: Option<&str>,
    ) -> anyhow::Result<ActivitySet> {
        let mut request = self
            .client
            .get(format!("{}/activities", self.conversation_url(conversation_id)))
            .bearer_auth(&self.credential);
        if let Some(watermark) = watermark {
            request = request.query(&[("watermark", watermark)]);
        }

        let batch = request
            .send()
            .await?
            .error_for_status()?
            .json::<ActivitySet>()
            .await?;

        Ok(batch)
    }

    async fn post_activity(
        &self,
        conversation_id: &str,
        activity: &Activity,
    ) -> anyhow::Result<String> {
        let response = self
            .client
            .post(format!("{}/activities", self.conversation_url(conversation_id)))
            .bearer_auth(&self.credential)
            .json(activity)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let id = response["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing activity id"))?
            .to_string();

        Ok(id)
    }
}
