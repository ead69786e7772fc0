//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (`https://` enables secure cookies)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_API_URL` - Hosted REST API base (default: `http://localhost:5000/api`)
//! - `STOREFRONT_API_KEY` - Sent as the `apikey` header (placeholder and entropy checked)
//! - `STOREFRONT_REQUEST_TIMEOUT_SECS` - Per-request timeout, 1-120 (default: 15)
//! - `STOREFRONT_DATA_DIR` - Per-visitor cart storage (default: data/visitors)
//! - `STOREFRONT_DELIVERY_FEE` - Flat home delivery fee in naira (default: 3500)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_DELIVERY_FEE: &str = "3500";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=120;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Hosted REST API connection
    pub api: ApiConfig,
    /// Root directory for per-visitor cart files
    pub data_dir: PathBuf,
    /// Flat fee added for home delivery
    pub delivery_fee: Decimal,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Hosted REST API connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: Url,
    /// Optional project key sent as the `apikey` header
    pub api_key: Option<SecretString>,
    /// Whole-request timeout; expiry surfaces as a transient failure
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env.parsed_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parsed_or("STOREFRONT_PORT", "3000")?;
        let base_url = parse_http_url("STOREFRONT_BASE_URL", &env.required("STOREFRONT_BASE_URL")?)?;

        let api = ApiConfig {
            base_url: parse_http_url(
                "STOREFRONT_API_URL",
                &env.or_default("STOREFRONT_API_URL", DEFAULT_API_URL),
            )?,
            api_key: env.optional_secret("STOREFRONT_API_KEY")?,
            timeout: env.timeout("STOREFRONT_REQUEST_TIMEOUT_SECS")?,
        };

        let data_dir = PathBuf::from(env.or_default("STOREFRONT_DATA_DIR", "data/visitors"));
        let delivery_fee: Decimal = env.parsed_or("STOREFRONT_DELIVERY_FEE", DEFAULT_DELIVERY_FEE)?;
        if delivery_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_DELIVERY_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            api,
            data_dir,
            delivery_fee,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.rate("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.rate("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    fn timeout(&self, key: &str) -> Result<Duration, ConfigError> {
        let secs: u64 = self.parsed_or(key, &DEFAULT_TIMEOUT_SECS.to_string())?;
        if !TIMEOUT_RANGE_SECS.contains(&secs) {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!(
                    "must be between {} and {} seconds",
                    TIMEOUT_RANGE_SECS.start(),
                    TIMEOUT_RANGE_SECS.end()
                ),
            ));
        }
        Ok(Duration::from_secs(secs))
    }

    fn rate(&self, key: &str, default: &str) -> Result<f32, ConfigError> {
        let rate: f32 = self.parsed_or(key, default)?;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(rate)
    }

    /// Load and validate an optional secret.
    fn optional_secret(&self, key: &str) -> Result<Option<SecretString>, ConfigError> {
        self.optional(key)
            .map(|value| {
                validate_secret_strength(&value, key)?;
                Ok(SecretString::from(value))
            })
            .transpose()
    }
}

fn parse_http_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the API provider."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("STOREFRONT_BASE_URL", "http://localhost:3000")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.api.base_url.as_str(), "http://localhost:5000/api");
        assert_eq!(config.api.timeout, Duration::from_secs(15));
        assert!(config.api.api_key.is_none());
        assert_eq!(config.delivery_fee, Decimal::from(3_500));
        assert_eq!(config.data_dir, PathBuf::from("data/visitors"));
        assert!(!config.secure_cookies());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_base_url() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::MissingEnvVar(key)) if key == "STOREFRONT_BASE_URL"
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STOREFRONT_BASE_URL", "https://dowslakers.com"),
            ("STOREFRONT_HOST", "0.0.0.0"),
            ("STOREFRONT_PORT", "8080"),
            ("STOREFRONT_API_URL", "https://api.dowslakers.com/v1"),
            ("STOREFRONT_REQUEST_TIMEOUT_SECS", "30"),
            ("STOREFRONT_DELIVERY_FEE", "5000"),
            ("STOREFRONT_API_KEY", "pk_9fQ2xL7mZr4Tq8WbN3vK"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.secure_cookies());
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.delivery_fee, Decimal::from(5_000));
        assert_eq!(
            config.api.api_key.unwrap().expose_secret(),
            "pk_9fQ2xL7mZr4Tq8WbN3vK"
        );
    }

    #[test]
    fn test_timeout_out_of_range() {
        for value in ["0", "121", "soon"] {
            let result = load(&[
                ("STOREFRONT_BASE_URL", "http://localhost:3000"),
                ("STOREFRONT_REQUEST_TIMEOUT_SECS", value),
            ]);
            assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))), "{value}");
        }
    }

    #[test]
    fn test_rejects_negative_fee_and_bad_urls() {
        assert!(load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_DELIVERY_FEE", "-1"),
        ])
        .is_err());
        assert!(load(&[("STOREFRONT_BASE_URL", "ftp://dowslakers.com")]).is_err());
        assert!(load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_API_URL", "not a url"),
        ])
        .is_err());
    }

    #[test]
    fn test_placeholder_api_key_rejected() {
        let result = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_API_KEY", "your-api-key-here"),
        ]);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
        assert!(matches!(
            validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_api_config_debug_redacts_key() {
        let config = ApiConfig {
            base_url: Url::parse("http://localhost:5000/api").unwrap(),
            api_key: Some(SecretString::from("super_private_key_value")),
            timeout: Duration::from_secs(15),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("localhost:5000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_private_key_value"));
    }
}
