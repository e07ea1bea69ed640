//! Web application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MIB_BASE_URL` - Public URL of the site
//! - `BACKEND_URL` - Upstream analytics backend base URL
//! - `BACKEND_API_KEY` - Shared token sent to the backend
//! - `MEMBERSTACK_SECRET_KEY` - Identity vendor admin API key (production)
//!
//! ## Optional
//! - `MIB_HOST` - Bind address (default: 127.0.0.1)
//! - `MIB_PORT` - Listen port (default: 3000)
//! - `MIB_ENV` - `development` or `production` (default: development)
//! - `MIB_LOG_JSON` - Emit JSON logs when set to `true`
//! - `MEMBERSTACK_SECRET_KEY_STAGING` - Admin API key for the staging environment
//! - `MEMBERSTACK_APP_ID` - Public app id handed to the browser SDK
//! - `MEMBERSTACK_ADMIN_URL` - Admin API base URL (default: <https://admin.memberstack.com>)
//! - `MEMBERSTACK_DEFAULT_ENV` - Vendor environment used when a request names none (default: production)
//! - `SESSION_STORE_URL` - Redis URL for sessions; in-process store when unset
//! - `ADDRESS_SAMPLE_FALLBACK` - Serve sample addresses when address search fails (default: false)
//! - `HTTP_TIMEOUT_SECS` - Outbound request timeout (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use mib_core::identity::VendorEnv;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected development or production, got {other:?}")),
        }
    }
}

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site
    pub base_url: String,
    pub environment: Environment,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Upstream analytics backend
    pub backend: BackendConfig,
    /// Identity vendor admin API
    pub memberstack: MemberstackConfig,
    /// Redis URL for the session store (contains credentials)
    pub session_store_url: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Upstream analytics backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
    /// Serve hard-coded sample addresses when address search fails
    pub address_sample_fallback: bool,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("address_sample_fallback", &self.address_sample_fallback)
            .finish()
    }
}

/// Identity vendor admin API configuration.
///
/// Implements `Debug` manually to redact the API keys.
#[derive(Clone)]
pub struct MemberstackConfig {
    pub admin_url: String,
    /// Public app id for the browser SDK
    pub app_id: Option<String>,
    pub production_key: SecretString,
    pub staging_key: Option<SecretString>,
    /// Environment used when a request does not name one
    pub default_env: VendorEnv,
    pub timeout: Duration,
}

impl std::fmt::Debug for MemberstackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberstackConfig")
            .field("admin_url", &self.admin_url)
            .field("app_id", &self.app_id)
            .field("production_key", &"[REDACTED]")
            .field(
                "staging_key",
                &self.staging_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("default_env", &self.default_env)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WebConfig {
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

        let host = parse_env_or_default::<IpAddr>("MIB_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("MIB_PORT", "3000")?;
        let base_url = get_required_env("MIB_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let environment = parse_env_or_default::<Environment>("MIB_ENV", "development")?;
        let log_json = parse_env_or_default::<bool>("MIB_LOG_JSON", "false")?;
        let timeout = Duration::from_secs(parse_env_or_default::<u64>("HTTP_TIMEOUT_SECS", "15")?);

        let backend = BackendConfig::from_env(timeout)?;
        let memberstack = MemberstackConfig::from_env(timeout)?;
        let session_store_url = get_optional_env("SESSION_STORE_URL").map(SecretString::from);

        Ok(Self {
            host,
            port,
            base_url,
            environment,
            log_json,
            backend,
            memberstack,
            session_store_url,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default::<f32>(
                "SENTRY_TRACES_SAMPLE_RATE",
                "0.1",
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Page the vendor checkout returns to. The `checkout` flag makes the
    /// account page show the detail-completion prompt.
    #[must_use]
    pub fn checkout_return_url(&self) -> String {
        format!("{}/account?checkout=success", self.base_url)
    }

    /// Whether the session cookie carries the `Secure` attribute.
    #[must_use]
    pub const fn secure_cookies(&self) -> bool {
        self.environment.is_production()
    }
}

impl BackendConfig {
    fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_env("BACKEND_URL")?
                .trim_end_matches('/')
                .to_string(),
            api_key: get_validated_secret("BACKEND_API_KEY")?,
            timeout,
            address_sample_fallback: parse_env_or_default::<bool>(
                "ADDRESS_SAMPLE_FALLBACK",
                "false",
            )?,
        })
    }
}

impl MemberstackConfig {
    fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        let staging_key = match get_optional_env("MEMBERSTACK_SECRET_KEY_STAGING") {
            Some(value) => {
                validate_secret_strength(&value, "MEMBERSTACK_SECRET_KEY_STAGING")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            admin_url: get_env_or_default("MEMBERSTACK_ADMIN_URL", "https://admin.memberstack.com")
                .trim_end_matches('/')
                .to_string(),
            app_id: get_optional_env("MEMBERSTACK_APP_ID"),
            production_key: get_validated_secret("MEMBERSTACK_SECRET_KEY")?,
            staging_key,
            default_env: parse_env_or_default::<VendorEnv>("MEMBERSTACK_DEFAULT_ENV", "production")?,
            timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("sk_8fJ2kQz9LmPx4RtW") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("your-memberstack-key", "MEMBERSTACK_SECRET_KEY")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(ref var, _) if var == "MEMBERSTACK_SECRET_KEY"));
        assert!(validate_secret_strength("changeme123", "BACKEND_API_KEY").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "BACKEND_API_KEY").is_err());
    }

    #[test]
    fn test_validate_secret_strength_accepts_real_looking_keys() {
        assert!(validate_secret_strength("sk_sb_3f9Kd82LqPzW7mXr1TnB", "MEMBERSTACK_SECRET_KEY").is_ok());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_socket_addr_and_cookie_security() {
        let mut config = crate::test_support::config("http://127.0.0.1:1", "http://127.0.0.1:2");
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.secure_cookies());

        config.environment = Environment::Production;
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_checkout_return_url() {
        let mut config = crate::test_support::config("http://127.0.0.1:1", "http://127.0.0.1:2");
        assert_eq!(
            config.checkout_return_url(),
            "http://localhost:3000/account?checkout=success"
        );

        config.base_url = "https://mib.example.com.au".to_string();
        assert_eq!(
            config.checkout_return_url(),
            "https://mib.example.com.au/account?checkout=success"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = crate::test_support::config("http://backend.test", "http://vendor.test");
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("http://backend.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("backend-test-key"));
        assert!(!debug_output.contains("sk_test_vendor"));
    }
}
