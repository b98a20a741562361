//! Shared handler state.

use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use mintgate_gateway::{Responder, WebhookResponder};
use mintgate_market::{PriceFeed, TokenLabel};
use mintgate_verification::VerifierContext;

/// Builds the [`Responder`] for one interaction token.
pub trait ResponderFactory: Send + Sync {
    fn responder(&self, interaction_token: &str) -> Arc<dyn Responder>;
}

/// Production factory: replies through Discord interaction webhooks.
pub struct WebhookResponders {
    http_client: reqwest::Client,
    api_base: String,
    application_id: String,
}

impl WebhookResponders {
    pub fn new(
        http_client: reqwest::Client,
        api_base: impl Into<String>,
        application_id: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_base: api_base.into(),
            application_id: application_id.into(),
        }
    }
}

impl ResponderFactory for WebhookResponders {
    fn responder(&self, interaction_token: &str) -> Arc<dyn Responder> {
        Arc::new(WebhookResponder::new(
            self.http_client.clone(),
            self.api_base.clone(),
            self.application_id.clone(),
            interaction_token,
        ))
    }
}

pub struct AppState {
    pub verifier: Arc<VerifierContext>,
    pub responders: Arc<dyn ResponderFactory>,
    pub prices: Arc<dyn PriceFeed>,
    pub token_label: TokenLabel,
    pub public_key: VerifyingKey,
    pub expose_metrics: bool,
}
