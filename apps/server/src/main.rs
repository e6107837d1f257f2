use anyhow::Context;
use qpay::domain::config::ApiConfig;
use qpay::kernel::config::load_config;
use qpay_logger::Logger;
use qpay_server::Server;

/// Explicit config file; without it an optional `qpay.*` in the working directory is used.
const CONFIG_PATH_VAR: &str = "QPAY_CONFIG";
/// Any value switches console logs to JSON lines.
const LOG_JSON_VAR: &str = "QPAY_LOG_JSON";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal on hosted platforms.
    let dotenv = dotenvy::dotenv().ok();

    let _log = Logger::builder()
        .name(env!("CARGO_PKG_NAME"))
        .json(std::env::var_os(LOG_JSON_VAR).is_some())
        .init()?;

    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded .env");
    }

    let cfg: ApiConfig = load_config(std::env::var(CONFIG_PATH_VAR).ok())
        .context("Critical: Configuration is malformed")?;

    Server::builder().config(cfg).build().await?.run().await
}
