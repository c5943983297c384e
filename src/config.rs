use std::{env, time::Duration};

use derive_more::Display;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_JWT_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ConfigError {
    #[display(fmt = "environment variable '{}' must be set", _0)]
    Missing(&'static str),

    #[display(fmt = "environment variable '{}' has an invalid value '{}'", _0, _1)]
    Invalid(&'static str, String),
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub paystack_secret_key: String,
    pub paystack_base_url: String,
    pub gateway_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl: Duration::from_secs(parse_or(&lookup, "JWT_TTL_SECS", DEFAULT_JWT_TTL_SECS)?),
            paystack_secret_key: required("PAYSTACK_SECRET_KEY")?,
            paystack_base_url: lookup("PAYSTACK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PAYSTACK_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            gateway_timeout: Duration::from_secs(parse_or(
                &lookup,
                "GATEWAY_TIMEOUT_SECS",
                DEFAULT_GATEWAY_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/eventure"),
        ("JWT_SECRET", "jwt-secret"),
        ("PAYSTACK_SECRET_KEY", "sk_test_123"),
    ];

    #[test]
    fn defaults_fill_optional_settings() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.jwt_ttl, Duration::from_secs(86_400));
        assert_eq!(config.paystack_base_url, "https://api.paystack.co");
        assert_eq!(config.gateway_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_required_variable_is_reported_by_name() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PAYSTACK_SECRET_KEY"));
    }

    #[test]
    fn blank_required_variable_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("JWT_SECRET", "  ");
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "9000"));
        pairs.push(("GATEWAY_TIMEOUT_SECS", "5"));
        pairs.push(("PAYSTACK_BASE_URL", "http://localhost:4010/"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.gateway_timeout, Duration::from_secs(5));
        assert_eq!(config.paystack_base_url, "http://localhost:4010");
    }

    #[test]
    fn unparsable_number_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("PORT", "eighty".to_string()));
    }
}
