use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub stripe: StripeConfig,
    pub paypal: PayPalConfig,
    pub cache: CacheConfig,
    pub audit: AuditConfig,
}

#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub publishable_key: String,
    /// Base URL of the Stripe REST API.
    pub api_base: String,
    /// Maximum accepted age of a signed webhook, in seconds.
    pub tolerance_seconds: u64,
    /// Plan applied when a checkout session carries no `plan` metadata.
    pub default_plan: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub mode: PayPalMode,
    pub webhook_id: String,
    /// Ask PayPal to verify every delivery before processing it.
    pub verify_signatures: bool,
    /// Overrides the mode-derived API host.
    pub api_base: Option<String>,
}

impl PayPalConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        if let Some(base) = self.api_base.as_deref() {
            return base;
        }
        match self.mode {
            PayPalMode::Live => "https://api-m.paypal.com",
            PayPalMode::Sandbox => "https://api-m.sandbox.paypal.com",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub ttl_seconds: u64,
    pub capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSON-lines file receiving every audit record.
    pub path: Option<PathBuf>,
    /// Number of records kept in memory.
    pub capacity: usize,
}

// --- Debug (secrets stay out of logs) ---

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "<redacted>" }
}

impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &redact(&self.secret_key))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("publishable_key", &self.publishable_key)
            .field("api_base", &self.api_base)
            .field("tolerance_seconds", &self.tolerance_seconds)
            .field("default_plan", &self.default_plan)
            .finish()
    }
}

impl fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("mode", &self.mode)
            .field("webhook_id", &self.webhook_id)
            .field("verify_signatures", &self.verify_signatures)
            .field("api_base", &self.api_base)
            .finish()
    }
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 3000, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            publishable_key: String::new(),
            api_base: "https://api.stripe.com".to_owned(),
            tolerance_seconds: 300,
            default_plan: "pro_monthly".to_owned(),
        }
    }
}

impl Default for PayPalConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            mode: PayPalMode::Sandbox,
            webhook_id: String::new(),
            verify_signatures: false,
            api_base: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { redis_url: None, ttl_seconds: 86_400, capacity: 100_000 }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { path: None, capacity: 1_024 }
    }
}
