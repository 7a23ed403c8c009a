//! # Gateway Configuration
//!
//! Process-wide configuration consumed by the dispatcher and the gateway
//! client. Built once at startup from the environment or a TOML document and
//! never mutated afterwards.

use crate::error::{PaymentError, PaymentResult};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Default Stripe API host
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Default currency when none is configured
pub const DEFAULT_CURRENCY: &str = "usd";

/// Default request timeout for the gateway client
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gateway mode, selects which secret key is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Test,
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Test => "Test",
            Mode::Live => "Live",
        }
    }
}

impl FromStr for Mode {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Mode::Test),
            "live" => Ok(Mode::Live),
            other => Err(PaymentError::Configuration(format!(
                "Invalid mode '{}', expected Test or Live",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which operation outcomes get logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogPolicy {
    Both,
    Success,
    #[default]
    Error,
    None,
}

impl LogPolicy {
    pub fn logs_success(&self) -> bool {
        matches!(self, LogPolicy::Both | LogPolicy::Success)
    }

    pub fn logs_error(&self) -> bool {
        matches!(self, LogPolicy::Both | LogPolicy::Error)
    }
}

impl FromStr for LogPolicy {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" => Ok(LogPolicy::Both),
            "success" => Ok(LogPolicy::Success),
            "error" => Ok(LogPolicy::Error),
            "none" | "false" | "off" => Ok(LogPolicy::None),
            other => Err(PaymentError::Configuration(format!(
                "Invalid log type '{}', expected both, success, error or none",
                other
            ))),
        }
    }
}

/// Gateway configuration
#[derive(Clone)]
pub struct GatewayConfig {
    /// Active mode
    pub mode: Mode,

    /// Secret key for the active mode. Never logged in full.
    api_key: String,

    /// Lowercase ISO 4217 code injected into create payloads
    pub default_currency: String,

    /// Which outcomes the dispatcher logs
    pub log_policy: LogPolicy,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// Pinned API version, account default when `None`
    pub api_version: Option<String>,

    /// Per-request timeout used by the HTTP client
    pub timeout_secs: u64,
}

/// Unresolved settings, shared by the env and TOML loaders
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    mode: Option<String>,
    test_secret: Option<String>,
    live_secret: Option<String>,
    currency: Option<String>,
    log_type: Option<String>,
    api_base_url: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TomlDocument {
    stripe: RawSettings,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// - `STRIPE_MODE` (`Test` or `Live`, default `Test`)
    /// - `STRIPE_TEST_SECRET` / `STRIPE_LIVE_SECRET` (required for the active mode)
    /// - `STRIPE_CURRENCY` (default `usd`)
    /// - `STRIPE_LOG_TYPE` (`both`, `success`, `error`, `none`; default `error`)
    /// - `STRIPE_API_BASE_URL`, `STRIPE_API_VERSION`, `STRIPE_TIMEOUT_SECS` (optional)
    pub fn from_env() -> PaymentResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> PaymentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup("STRIPE_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                PaymentError::Configuration(format!("Invalid STRIPE_TIMEOUT_SECS '{}'", raw))
            })?),
            None => None,
        };

        Self::resolve(RawSettings {
            mode: lookup("STRIPE_MODE"),
            test_secret: lookup("STRIPE_TEST_SECRET"),
            live_secret: lookup("STRIPE_LIVE_SECRET"),
            currency: lookup("STRIPE_CURRENCY"),
            log_type: lookup("STRIPE_LOG_TYPE"),
            api_base_url: lookup("STRIPE_API_BASE_URL"),
            api_version: lookup("STRIPE_API_VERSION"),
            timeout_secs,
        })
    }

    /// Load configuration from the `[stripe]` table of a TOML document
    pub fn from_toml_str(content: &str) -> PaymentResult<Self> {
        let doc: TomlDocument = toml::from_str(content)
            .map_err(|e| PaymentError::Configuration(format!("Invalid TOML config: {}", e)))?;
        Self::resolve(doc.stripe)
    }

    /// Create config with explicit values (for testing)
    pub fn new(mode: Mode, api_key: impl Into<String>) -> Self {
        Self {
            mode,
            api_key: api_key.into(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            log_policy: LogPolicy::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    fn resolve(raw: RawSettings) -> PaymentResult<Self> {
        let mode = match raw.mode.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(m) => m.parse()?,
            None => Mode::Test,
        };

        let key = match mode {
            Mode::Test => raw.test_secret,
            Mode::Live => raw.live_secret,
        };
        let api_key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                PaymentError::Configuration(format!(
                    "Stripe API secret key is not set for {} mode",
                    mode
                ))
            })?;

        let mut config = Self::new(mode, api_key);

        if let Some(currency) = raw.currency.filter(|c| !c.trim().is_empty()) {
            config = config.with_default_currency(currency)?;
        }
        if let Some(log_type) = raw.log_type.filter(|l| !l.trim().is_empty()) {
            config.log_policy = log_type.parse()?;
        }
        if let Some(url) = raw.api_base_url.filter(|u| !u.trim().is_empty()) {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        config.api_version = raw.api_version.filter(|v| !v.trim().is_empty());
        if let Some(secs) = raw.timeout_secs {
            config.timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject keys that are empty or clearly belong to the other mode
    pub fn validate(&self) -> PaymentResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "Stripe API secret key is empty".to_string(),
            ));
        }
        let mismatched = match self.mode {
            Mode::Test => self.api_key.starts_with("sk_live_"),
            Mode::Live => self.api_key.starts_with("sk_test_"),
        };
        if mismatched {
            return Err(PaymentError::Configuration(format!(
                "Secret key {} does not match {} mode",
                self.masked_key(),
                self.mode
            )));
        }
        Ok(())
    }

    /// The secret key, for the transport layer only
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Key safe for logs: prefix and last four characters
    pub fn masked_key(&self) -> String {
        let prefix_len = if self.api_key.starts_with("sk_test_") || self.api_key.starts_with("sk_live_") {
            8
        } else {
            3
        };
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= prefix_len + 4 {
            return "****".to_string();
        }
        let prefix: String = chars[..prefix_len].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}****{}", prefix, suffix)
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    pub fn is_test_mode(&self) -> bool {
        self.mode == Mode::Test
    }

    pub fn is_live_mode(&self) -> bool {
        self.mode == Mode::Live
    }

    /// Builder: set the default currency (stored lowercase)
    pub fn with_default_currency(mut self, currency: impl AsRef<str>) -> PaymentResult<Self> {
        let currency = currency.as_ref().trim().to_ascii_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::Configuration(format!(
                "Invalid currency code '{}'",
                currency
            )));
        }
        self.default_currency = currency;
        Ok(self)
    }

    /// Builder: set the outcome log policy
    pub fn with_log_policy(mut self, policy: LogPolicy) -> Self {
        self.log_policy = policy;
        self
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("mode", &self.mode)
            .field("api_key", &self.masked_key())
            .field("default_currency", &self.default_currency)
            .field("log_policy", &self.log_policy)
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
