use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Base name of the optional config file (`qpay.toml`, `qpay.yaml`, ...).
const DEFAULT_CONFIG_FILE: &str = "qpay";
const ENV_PREFIX: &str = "QPAY";

/// Variables set by hosting platforms or documented by payment providers.
/// They take precedence over the file and the `QPAY__` variables.
const PLATFORM_ENV: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("REDIS_URL", "cache.redis_url"),
    ("STRIPE_SECRET_KEY", "stripe.secret_key"),
    ("STRIPE_WEBHOOK_SECRET", "stripe.webhook_secret"),
    ("STRIPE_PUBLISHABLE_KEY", "stripe.publishable_key"),
    ("PAYPAL_CLIENT_ID", "paypal.client_id"),
    ("PAYPAL_CLIENT_SECRET", "paypal.client_secret"),
    ("PAYPAL_MODE", "paypal.mode"),
    ("PAYPAL_WEBHOOK_ID", "paypal.webhook_id"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config {
        #[source]
        source: config::ConfigError,
        context: Option<Cow<'static, str>>,
    },
}

trait ConfigResultExt<T> {
    fn context(self, context: &'static str) -> Result<T, ConfigError>;
}

impl<T> ConfigResultExt<T> for Result<T, config::ConfigError> {
    fn context(self, context: &'static str) -> Result<T, ConfigError> {
        self.map_err(|source| ConfigError::Config { source, context: Some(context.into()) })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

/// Loads configuration from the process environment.
///
/// Layers, lowest precedence first:
/// 1. **File**: `path` if given (must exist), otherwise an optional `qpay.*` file
///    in the working directory.
/// 2. **Prefixed environment**: `QPAY__SECTION__KEY` (e.g. `QPAY__STRIPE__TOLERANCE_SECONDS`
///    maps to `stripe.tolerance_seconds`).
/// 3. **Platform variables**: `PORT`, `REDIS_URL`, `STRIPE_*` and `PAYPAL_*`.
///
/// # Errors
/// Fails when an explicit file is missing or malformed, or when the merged values
/// do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use qpay_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_config_with_env(path, std::env::vars().collect())
}

/// Same as [`load_config`] with an explicit set of environment variables.
pub fn load_config_with_env<T>(
    path: Option<impl AsRef<Path>>,
    vars: HashMap<String, String>,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (effective_path, required) = path.map_or_else(
        || (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        |p| (p.as_ref().to_path_buf(), true),
    );

    info!(path = %effective_path.display(), required, "Loading config");

    let mut builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(Some(vars.clone())),
        );

    for (var, key) in PLATFORM_ENV {
        let value = vars.get(*var).filter(|v| !v.trim().is_empty()).cloned();
        builder = builder.set_override_option(*key, value).context("Invalid platform override")?;
    }

    builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}
