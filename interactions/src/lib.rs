//! Discord HTTP interactions endpoint.
//!
//! Discord POSTs every slash-command invocation to `/interactions`. Each
//! request is signature-checked, acknowledged immediately with a deferred
//! response, and the real work runs in a spawned task that edits the reply
//! through the interaction webhook.

pub mod commands;
pub mod error;
pub mod handlers;
pub mod model;
pub mod server;
pub mod signature;
pub mod state;

pub use commands::command_definitions;
pub use error::InteractionError;
pub use server::{router, serve};
pub use signature::{parse_public_key, verify_request};
pub use state::{AppState, ResponderFactory, WebhookResponders};
