use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] mintgate_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] mintgate_store_lmdb::LmdbError),

    #[error("gateway error: {0}")]
    Gateway(#[from] mintgate_gateway::GatewayError),

    #[error("watchdog error: {0}")]
    Watchdog(#[from] mintgate_verification::WatchdogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
