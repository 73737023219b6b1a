use std::env;
use std::fmt;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.razorpay.com";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_WEBHOOK_SIGNATURE_HEADER: &str = "X-Signature";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// A value that must never end up in logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T: Clone + Default> {
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Publishable key, handed to clients.
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub currency: String,
    pub webhook_signature_header: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Reads the configuration from the process environment. Missing gateway
    /// credentials fail here, before the server binds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = match lookup("PORT") {
            Some(p) => p.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let gateway = GatewayConfig {
            base_url: optional("RAZORPAY_BASE_URL", DEFAULT_GATEWAY_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            key_id: required("RAZORPAY_KEY_ID")?,
            key_secret: Secret::new(required("RAZORPAY_KEY_SECRET")?),
            webhook_secret: Secret::new(required("RAZORPAY_WEBHOOK_SECRET")?),
            currency: optional("PAYMENT_CURRENCY", DEFAULT_CURRENCY).to_uppercase(),
            webhook_signature_header: optional(
                "WEBHOOK_SIGNATURE_HEADER",
                DEFAULT_WEBHOOK_SIGNATURE_HEADER,
            ),
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            host: optional("HOST", DEFAULT_HOST),
            port,
            gateway,
        })
    }
}
