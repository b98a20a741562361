//! [`RoleGateway`] over the Discord REST API (v10).

use std::time::Duration;

use async_trait::async_trait;
use mintgate_types::UserId;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::{ChannelId, GatewayError, RoleGateway};

/// Base URL of the Discord REST API.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct CreatedChannel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Acts on members of one guild with one role.
pub struct DiscordGateway {
    http_client: reqwest::Client,
    api_base: String,
    bot_token: String,
    guild_id: String,
    role_id: String,
}

impl DiscordGateway {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        guild_id: impl Into<String>,
        role_id: impl Into<String>,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            guild_id: guild_id.into(),
            role_id: role_id.into(),
        }
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bot {}", self.bot_token))
    }

    fn member_role_path(&self, user: &UserId) -> String {
        format!(
            "/guilds/{}/members/{}/roles/{}",
            self.guild_id, user, self.role_id
        )
    }

    /// Replace every global command of `application_id` with `commands`.
    /// Global commands are also offered in DMs with the bot.
    pub async fn overwrite_global_commands(
        &self,
        application_id: &str,
        commands: &serde_json::Value,
    ) -> Result<(), GatewayError> {
        let path = format!("/applications/{application_id}/commands");
        let response = self.request(Method::PUT, &path).json(commands).send().await?;
        check_status(response).await.map(|_| ())
    }
}

/// Map non-2xx responses to [`GatewayError`].
pub(crate) async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .json::<RateLimitBody>()
            .await
            .map(|b| b.retry_after)
            .unwrap_or(1.0);
        return Err(GatewayError::RateLimited { retry_after_secs });
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Http {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RoleGateway for DiscordGateway {
    async fn grant_role(&self, user: &UserId) -> Result<(), GatewayError> {
        let response = self
            .request(Method::PUT, &self.member_role_path(user))
            .send()
            .await?;
        check_status(response).await?;
        tracing::debug!(user = %user, "granted role");
        Ok(())
    }

    async fn remove_role(&self, user: &UserId) -> Result<(), GatewayError> {
        let response = self
            .request(Method::DELETE, &self.member_role_path(user))
            .send()
            .await?;
        match check_status(response).await {
            Ok(_) => {
                tracing::debug!(user = %user, "removed role");
                Ok(())
            }
            // The member left the guild, so there is no role left to remove.
            Err(GatewayError::Http { status: 404, .. }) => {
                tracing::debug!(user = %user, "member not in guild, nothing to remove");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn open_direct_channel(&self, user: &UserId) -> Result<ChannelId, GatewayError> {
        let response = self
            .request(Method::POST, "/users/@me/channels")
            .json(&json!({ "recipient_id": user.as_str() }))
            .send()
            .await?;
        let channel: CreatedChannel = check_status(response).await?.json().await?;
        Ok(ChannelId::new(channel.id))
    }

    async fn send_channel_message(
        &self,
        channel: &ChannelId,
        text: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .request(Method::POST, &format!("/channels/{channel}/messages"))
            .json(&json!({ "content": text }))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}
