//! mintgate bot: wires the registry, ledger oracle, Discord gateway and
//! interactions endpoint together and runs the background tasks.
//!
//! - [`BotConfig`] loads and validates settings from TOML
//! - [`MintgateBot`] owns the long-lived handles and runs the service
//! - [`DailyReport`] posts the market report at every UTC midnight
//! - [`ShutdownController`] fans SIGINT/SIGTERM out to every task

pub mod bot;
pub mod config;
pub mod error;
pub mod report;
pub mod shutdown;

pub use bot::{register_commands, MintgateBot, Services};
pub use config::BotConfig;
pub use error::BotError;
pub use report::{DailyReport, WallClock};
pub use shutdown::{ShutdownCause, ShutdownController};
