//! Request handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use mintgate_gateway::RoleGateway;
use mintgate_market::format_report;
use mintgate_types::UserId;
use mintgate_verification::VerificationSession;
use prometheus::{Encoder, TextEncoder};

use crate::commands::{ADDRESS_OPTION, PRICE, VERIFY};
use crate::model::{Interaction, InteractionResponse, APPLICATION_COMMAND, PING};
use crate::signature::{verify_request, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::{AppState, InteractionError};

const DM_GREETING: &str = "Hello! Start typing `/` here and pick /verify to prove you hold an eligible NFT.";
const DM_SENT: &str =
    "Verification continues in a direct message. I've just sent you one.";
const DM_UNAVAILABLE: &str =
    "I could not open a direct message with you right now. Please try again in a few minutes.";
const PRICE_UNAVAILABLE: &str = "Price data is unavailable right now. Please try again later.";

fn dm_blocked(channel: &str) -> String {
    format!(
        "Verification needs a direct message from me, but your privacy settings block them. \
         Allow direct messages from server members (*Settings* -> *Privacy & Safety*), \
         then message me here: https://discord.com/channels/@me/{channel}"
    )
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    if !state.expose_metrics {
        return StatusCode::NOT_FOUND.into_response();
    }
    let families = state.verifier.metrics().registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&families, &mut buffer) {
        tracing::error!("metrics encoding failed: {e}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        buffer,
    )
        .into_response()
}

pub async fn interactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, InteractionError> {
    let signature = header_str(&headers, SIGNATURE_HEADER)?;
    let timestamp = header_str(&headers, TIMESTAMP_HEADER)?;
    verify_request(&state.public_key, signature, timestamp, &body)?;

    let interaction: Interaction =
        serde_json::from_slice(&body).map_err(|e| InteractionError::Malformed(e.to_string()))?;

    match interaction.kind {
        PING => Ok(Json(InteractionResponse::pong())),
        APPLICATION_COMMAND => Ok(Json(dispatch(&state, &interaction))),
        other => Err(InteractionError::Malformed(format!(
            "unsupported interaction type {other}"
        ))),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, InteractionError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(InteractionError::MissingHeader(name))
}

fn dispatch(state: &Arc<AppState>, interaction: &Interaction) -> InteractionResponse {
    let Some(user) = interaction.invoker() else {
        return InteractionResponse::ephemeral_message("Could not identify the invoking user.");
    };
    let token = interaction.token.clone();
    match interaction.command_name() {
        Some(VERIFY) if interaction.in_guild() => {
            tracing::info!(user = %user, "verify invoked in guild, redirecting to DM");
            redirect_to_dm(state, user, token);
            InteractionResponse::deferred(true)
        }
        Some(VERIFY) => match interaction.string_option(ADDRESS_OPTION) {
            Some(address) => {
                start_session(state, user, address.to_string(), token);
                InteractionResponse::deferred(false)
            }
            None => InteractionResponse::ephemeral_message("Please provide your wallet address."),
        },
        Some(PRICE) => {
            send_price(state, token);
            InteractionResponse::deferred(false)
        }
        other => {
            tracing::debug!(command = ?other, "unknown command");
            InteractionResponse::ephemeral_message("Unknown command.")
        }
    }
}

fn start_session(state: &Arc<AppState>, user: UserId, address: String, token: String) {
    let ctx = Arc::clone(&state.verifier);
    let responder = state.responders.responder(&token);
    tokio::spawn(async move {
        // Outcome is logged and reported to the user inside the session.
        let _ = VerificationSession::run(ctx, user, &address, responder.as_ref()).await;
    });
}

fn redirect_to_dm(state: &Arc<AppState>, user: UserId, token: String) {
    let gateway = Arc::clone(&state.verifier.gateway);
    let responder = state.responders.responder(&token);
    tokio::spawn(async move {
        let text = match open_dm(gateway.as_ref(), &user).await {
            Ok(()) => DM_SENT.to_string(),
            Err(text) => text,
        };
        if let Err(e) = responder.edit_original(&text).await {
            tracing::warn!(user = %user, "redirect reply not delivered: {e}");
        }
    });
}

/// Open the DM channel and greet. On failure returns the guild reply text.
async fn open_dm(gateway: &dyn RoleGateway, user: &UserId) -> Result<(), String> {
    let channel = gateway.open_direct_channel(user).await.map_err(|e| {
        tracing::warn!(user = %user, "cannot open DM channel: {e}");
        DM_UNAVAILABLE.to_string()
    })?;
    gateway
        .send_channel_message(&channel, DM_GREETING)
        .await
        .map_err(|e| {
            tracing::info!(user = %user, "DM greeting blocked: {e}");
            dm_blocked(channel.as_str())
        })
}

fn send_price(state: &Arc<AppState>, token: String) {
    let prices = Arc::clone(&state.prices);
    let label = state.token_label.clone();
    let responder = state.responders.responder(&token);
    tokio::spawn(async move {
        let text = match prices.ticker().await {
            Ok(ticker) => format_report(&label, &ticker),
            Err(e) => {
                tracing::warn!("price command failed: {e}");
                PRICE_UNAVAILABLE.to_string()
            }
        };
        if let Err(e) = responder.edit_original(&text).await {
            tracing::warn!("price reply not delivered: {e}");
        }
    });
}
