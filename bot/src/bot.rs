//! Service wiring.

use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use mintgate_gateway::{ChannelId, DiscordGateway, RoleGateway};
use mintgate_interactions::{
    command_definitions, parse_public_key, AppState, ResponderFactory, WebhookResponders,
};
use mintgate_market::{MarketClient, PriceFeed};
use mintgate_oracle::SolanaRpcOracle;
use mintgate_store_lmdb::LmdbEnvironment;
use mintgate_verification::{run_pass, run_watchdog, PassReport, VerifierContext};
use tokio::net::TcpListener;

use crate::{BotConfig, BotError, DailyReport, ShutdownController};

/// External services the bot talks to.
pub struct Services {
    pub verifier: Arc<VerifierContext>,
    pub gateway: Arc<dyn RoleGateway>,
    pub prices: Arc<dyn PriceFeed>,
    pub responders: Arc<dyn ResponderFactory>,
}

pub struct MintgateBot {
    config: BotConfig,
    services: Services,
    public_key: VerifyingKey,
}

impl MintgateBot {
    /// Open the registry and build the production clients.
    pub fn open(config: BotConfig) -> Result<Self, BotError> {
        let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)?;
        tracing::debug!(schema_version = env.schema_version()?, "registry ready");

        let discord = Arc::new(DiscordGateway::new(
            config.discord_api_base.clone(),
            config.bot_token.clone(),
            config.guild_id.clone(),
            config.role_id.clone(),
        ));
        let verifier = VerifierContext::new(
            Arc::new(env.ownership_store()),
            Arc::new(SolanaRpcOracle::new(config.rpc_url.clone())),
            discord.clone(),
            config.verifier_settings()?,
        );
        let prices = MarketClient::new(
            config.market_api_base.clone(),
            config.coin_id.clone(),
            config.retry_policy(),
        );
        let responders = WebhookResponders::new(
            reqwest::Client::new(),
            config.discord_api_base.clone(),
            config.application_id.clone(),
        );

        Self::new(
            config,
            Services {
                verifier: Arc::new(verifier),
                gateway: discord,
                prices: Arc::new(prices),
                responders: Arc::new(responders),
            },
        )
    }

    pub fn new(config: BotConfig, services: Services) -> Result<Self, BotError> {
        let public_key = parse_public_key(&config.public_key)
            .map_err(|e| BotError::Config(format!("public_key: {e}")))?;
        Ok(Self {
            config,
            services,
            public_key,
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn verifier(&self) -> &Arc<VerifierContext> {
        &self.services.verifier
    }

    /// Bind `listen_addr` and run until shutdown.
    pub async fn run(self, shutdown: &ShutdownController) -> Result<(), BotError> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Run the watchdog, the optional daily report and the interactions
    /// endpoint on `listener` until shutdown.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: &ShutdownController,
    ) -> Result<(), BotError> {
        let settings = &self.services.verifier.settings;
        tracing::info!(
            eligible = settings.eligible.len(),
            watchdog_every = %mintgate_utils::format_duration(settings.watchdog_period),
            metrics = self.config.enable_metrics,
            "starting mintgate bot"
        );

        let watchdog = tokio::spawn(run_watchdog(
            Arc::clone(&self.services.verifier),
            shutdown.subscribe(),
        ));

        let report = match &self.config.report_channel_id {
            Some(channel) => {
                let task = DailyReport::new(
                    Arc::clone(&self.services.prices),
                    Arc::clone(&self.services.gateway),
                    ChannelId::new(channel.as_str()),
                    self.config.token_label.clone(),
                );
                Some(tokio::spawn(task.run(shutdown.subscribe())))
            }
            None => {
                tracing::info!("report_channel_id not set, daily market report disabled");
                None
            }
        };

        let state = Arc::new(AppState {
            verifier: Arc::clone(&self.services.verifier),
            responders: Arc::clone(&self.services.responders),
            prices: Arc::clone(&self.services.prices),
            token_label: self.config.token_label.clone(),
            public_key: self.public_key,
            expose_metrics: self.config.enable_metrics,
        });
        let served = mintgate_interactions::serve(listener, state, shutdown.subscribe()).await;

        // The listener can also stop on its own; take the background tasks down with it.
        shutdown.shutdown();
        if let Err(e) = watchdog.await {
            tracing::error!(error = %e, "watchdog task panicked");
        }
        if let Some(report) = report {
            if let Err(e) = report.await {
                tracing::error!(error = %e, "daily report task panicked");
            }
        }
        served?;
        tracing::info!("mintgate bot stopped");
        Ok(())
    }

    /// One reconciliation pass, outside the periodic schedule.
    pub async fn reconcile_once(&self) -> Result<PassReport, BotError> {
        Ok(run_pass(&self.services.verifier).await?)
    }
}

/// Overwrite the application's global commands with `/verify` and `/price`.
pub async fn register_commands(config: &BotConfig) -> Result<(), BotError> {
    for (name, value) in [
        ("bot_token", &config.bot_token),
        ("application_id", &config.application_id),
    ] {
        if value.trim().is_empty() {
            return Err(BotError::Config(format!("{name} must be set")));
        }
    }
    let discord = DiscordGateway::new(
        config.discord_api_base.clone(),
        config.bot_token.clone(),
        config.guild_id.clone(),
        config.role_id.clone(),
    );
    let commands = command_definitions(&config.token_label);
    discord
        .overwrite_global_commands(&config.application_id, &commands)
        .await?;
    tracing::info!(application = %config.application_id, "registered global commands");
    Ok(())
}
