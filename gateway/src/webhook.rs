//! [`Responder`] for one Discord interaction, via its webhook token.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use crate::discord::check_status;
use crate::{GatewayError, Responder};

/// Edits and follows up on a single deferred interaction. Interaction
/// webhooks are authorised by their token, not by the bot token.
pub struct WebhookResponder {
    http_client: reqwest::Client,
    api_base: String,
    application_id: String,
    interaction_token: String,
}

impl WebhookResponder {
    pub fn new(
        http_client: reqwest::Client,
        api_base: impl Into<String>,
        application_id: impl Into<String>,
        interaction_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            application_id: application_id.into(),
            interaction_token: interaction_token.into(),
        }
    }

    fn webhook_url(&self) -> String {
        format!(
            "{}/webhooks/{}/{}",
            self.api_base, self.application_id, self.interaction_token
        )
    }

    async fn send(&self, method: Method, url: String, text: &str) -> Result<(), GatewayError> {
        let response = self
            .http_client
            .request(method, url)
            .json(&json!({ "content": text }))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

#[async_trait]
impl Responder for WebhookResponder {
    async fn edit_original(&self, text: &str) -> Result<(), GatewayError> {
        let url = format!("{}/messages/@original", self.webhook_url());
        self.send(Method::PATCH, url, text).await
    }

    async fn follow_up(&self, text: &str) -> Result<(), GatewayError> {
        self.send(Method::POST, self.webhook_url(), text).await
    }
}
