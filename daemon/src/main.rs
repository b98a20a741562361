//! mintgate daemon: entry point for running the verification bot.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mintgate_bot::{BotConfig, MintgateBot, ShutdownController};
use mintgate_utils::LogFormat;

#[derive(Parser)]
#[command(name = "mintgate-daemon", about = "NFT holder verification bot")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "MINTGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the registry database.
    #[arg(long, env = "MINTGATE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address of the interactions endpoint, e.g. "0.0.0.0:8080".
    #[arg(long, env = "MINTGATE_LISTEN")]
    listen: Option<SocketAddr>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "MINTGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "MINTGATE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Discord bot token.
    #[arg(long, env = "MINTGATE_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the bot: interactions endpoint, watchdog and daily report.
    Run,
    /// Overwrite the application's global slash commands.
    #[command(name = "register-commands")]
    RegisterCommands,
    /// Run one reconciliation pass and print what changed.
    #[command(name = "reconcile-once")]
    ReconcileOnce,
}

fn load_config(cli: &Cli) -> anyhow::Result<BotConfig> {
    let mut config = match &cli.config {
        Some(path) => BotConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BotConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(token) = &cli.bot_token {
        config.bot_token = token.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    mintgate_utils::init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("loaded config from {}", path.display());
    }

    match cli.command {
        Command::Run => {
            config.validate()?;
            let bot = MintgateBot::open(config)?;
            let shutdown = Arc::new(ShutdownController::new());
            {
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move {
                    shutdown.wait_for_signal().await;
                });
            }
            bot.run(&shutdown).await?;
            tracing::info!("mintgate daemon exited cleanly");
        }
        Command::RegisterCommands => {
            mintgate_bot::register_commands(&config).await?;
            println!("registered /verify and /price");
        }
        Command::ReconcileOnce => {
            config.validate()?;
            let bot = MintgateBot::open(config)?;
            let report = bot.reconcile_once().await?;
            println!("checked {} records", report.checked);
            for stale in &report.stale {
                println!(
                    "stale: {} held by {} (was {} for user {})",
                    stale.token,
                    stale.current_owner,
                    stale.record.owner_address,
                    stale.record.requesting_user
                );
            }
            for token in &report.inconclusive {
                println!("inconclusive: {token}");
            }
            for token in &report.delete_failures {
                println!("delete failed: {token}");
            }
            for token in &report.reverified {
                println!("re-verified during pass, kept: {token}");
            }
            for user in &report.revoked {
                println!("revoked: {user}");
            }
            for user in &report.retained {
                println!("retained: {user}");
            }
            for failure in &report.revocation_failures {
                println!("revocation failed: {} ({})", failure.user, failure.reason);
            }
            if report.is_clean() {
                println!("registry is consistent with the ledger");
            }
        }
    }

    Ok(())
}
