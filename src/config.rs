//! Deployment configuration: one Superset endpoint and one admin credential,
//! plus the knobs of the HTTP surface. Loaded from the environment, with CLI
//! flags overriding, and validated before the pipeline is built.

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::identity::CallerIdentity;
use crate::rls::ElevatedLocationPolicy;

pub const ENV_URL: &str = "SUPERSET_EMBEDDED_URL";
pub const ENV_USERNAME: &str = "SUPERSET_EMBEDDED_USERNAME";
pub const ENV_PASSWORD: &str = "SUPERSET_EMBEDDED_PASSWORD";
pub const ENV_HTTP_PORT: &str = "GUEST_TOKEN_HTTP_PORT";
pub const ENV_TIMEOUT_SECS: &str = "GUEST_TOKEN_TIMEOUT_SECS";
pub const ENV_ELEVATED_LOCATIONS: &str = "GUEST_TOKEN_ELEVATED_LOCATIONS";
pub const ENV_DEFAULT_IDENTITY: &str = "GUEST_TOKEN_DEFAULT_IDENTITY";

pub const DEFAULT_HTTP_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set and non-empty")]
    Missing(&'static str),
    #[error("{name} is not a valid http(s) URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
    #[error("URL should not end with a trailing slash (/)")]
    TrailingSlash,
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Wrapper that keeps a credential out of `Debug` output and logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn expose(&self) -> &str { &self.0 }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("[REDACTED]") }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupersetConfig {
    /// Base URL without a trailing slash, e.g. `https://bi.example.com`.
    pub url: String,
    pub username: String,
    pub password: Secret,
}

impl SupersetConfig {
    pub fn new(url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let cfg = Self { url: url.into(), username: username.into(), password: Secret::new(password) };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let url = lookup(ENV_URL).unwrap_or_default();
        let username = lookup(ENV_USERNAME).unwrap_or_default();
        let password = lookup(ENV_PASSWORD).unwrap_or_default();
        Self::new(url, username, password)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.is_empty() { return Err(ConfigError::Missing(ENV_USERNAME)); }
        if self.password.expose().is_empty() { return Err(ConfigError::Missing(ENV_PASSWORD)); }
        if self.url.is_empty() { return Err(ConfigError::Missing(ENV_URL)); }
        let parsed = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl { name: ENV_URL, reason: e.to_string() })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl { name: ENV_URL, reason: format!("unsupported scheme '{}'", parsed.scheme()) });
        }
        if self.url.ends_with('/') || self.url.ends_with('\\') { return Err(ConfigError::TrailingSlash); }
        Ok(())
    }
}

/// Everything `main` needs to stand the service up.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub superset: SupersetConfig,
    pub http_port: u16,
    pub request_timeout: Option<Duration>,
    pub elevated_locations: ElevatedLocationPolicy,
    /// Identity used when a request carries no body.
    pub default_identity: Option<CallerIdentity>,
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn parse_num<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid { name, reason: e.to_string() })
}

impl ServiceConfig {
    pub fn load(args: &[String]) -> Result<Self, ConfigError> {
        Self::load_with(args, |k| std::env::var(k).ok())
    }

    /// CLI flags override environment variables.
    pub fn load_with<F: Fn(&str) -> Option<String>>(args: &[String], lookup: F) -> Result<Self, ConfigError> {
        let superset = SupersetConfig::from_lookup(&lookup)?;

        let http_port = match parse_flag(args, "--http-port").or_else(|| lookup(ENV_HTTP_PORT)) {
            Some(v) => parse_num::<u16>(ENV_HTTP_PORT, &v)?,
            None => DEFAULT_HTTP_PORT,
        };

        let request_timeout = match parse_flag(args, "--timeout-secs").or_else(|| lookup(ENV_TIMEOUT_SECS)) {
            Some(v) => match parse_num::<u64>(ENV_TIMEOUT_SECS, &v)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        let elevated_locations = match parse_flag(args, "--elevated-locations").or_else(|| lookup(ENV_ELEVATED_LOCATIONS)) {
            Some(v) => v.parse().map_err(|reason| ConfigError::Invalid { name: ENV_ELEVATED_LOCATIONS, reason })?,
            None => ElevatedLocationPolicy::default(),
        };

        let default_identity = match lookup(ENV_DEFAULT_IDENTITY).filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(
                serde_json::from_str::<CallerIdentity>(&raw)
                    .map_err(|e| ConfigError::Invalid { name: ENV_DEFAULT_IDENTITY, reason: e.to_string() })?,
            ),
            None => None,
        };

        Ok(Self { superset, http_port, request_timeout, elevated_locations, default_identity })
    }

    pub fn usage() -> String {
        format!(
            "superset-guest-token\n\nUSAGE:\n  superset-guest-token [--http-port N] [--timeout-secs N] [--elevated-locations identity|omit]\n\n\
             ENVIRONMENT:\n  {ENV_URL}        Superset base URL (required, no trailing slash)\n  \
             {ENV_USERNAME}   admin username (required)\n  {ENV_PASSWORD}   admin password (required)\n  \
             {ENV_HTTP_PORT}        listen port (default {DEFAULT_HTTP_PORT})\n  \
             {ENV_TIMEOUT_SECS}     per-call platform timeout, 0 disables\n  \
             {ENV_ELEVATED_LOCATIONS} location scoping for ADMIN callers\n  \
             {ENV_DEFAULT_IDENTITY}  JSON identity used when a request has no body\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![(ENV_URL, "https://bi.example.com"), (ENV_USERNAME, "embed"), (ENV_PASSWORD, "hunter2")]
    }

    #[test]
    fn valid_superset_config() {
        let cfg = SupersetConfig::from_lookup(env(&base())).unwrap();
        assert_eq!(cfg.url, "https://bi.example.com");
        assert_eq!(cfg.password.expose(), "hunter2");
    }

    #[test]
    fn rejects_missing_and_bad_values() {
        assert_eq!(SupersetConfig::from_lookup(env(&[])).unwrap_err(), ConfigError::Missing(ENV_USERNAME));
        assert_eq!(
            SupersetConfig::new("https://bi.example.com/", "u", "p").unwrap_err(),
            ConfigError::TrailingSlash
        );
        assert!(matches!(SupersetConfig::new("not a url", "u", "p"), Err(ConfigError::InvalidUrl { .. })));
        assert!(matches!(SupersetConfig::new("ftp://bi.example.com", "u", "p"), Err(ConfigError::InvalidUrl { .. })));
        // hosts without a TLD are fine
        assert!(SupersetConfig::new("http://superset:8088", "u", "p").is_ok());
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let cfg = SupersetConfig::new("https://bi.example.com", "embed", "hunter2").unwrap();
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn service_defaults() {
        let cfg = ServiceConfig::load_with(&[], env(&base())).unwrap();
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(cfg.request_timeout, None);
        assert_eq!(cfg.elevated_locations, ElevatedLocationPolicy::FromIdentity);
        assert!(cfg.default_identity.is_none());
    }

    #[test]
    fn flags_override_env() {
        let mut pairs = base();
        pairs.push((ENV_HTTP_PORT, "8080"));
        pairs.push((ENV_TIMEOUT_SECS, "5"));
        pairs.push((ENV_ELEVATED_LOCATIONS, "omit"));
        let args: Vec<String> = ["bin", "--http-port", "9090"].iter().map(|s| s.to_string()).collect();
        let cfg = ServiceConfig::load_with(&args, env(&pairs)).unwrap();
        assert_eq!(cfg.http_port, 9090);
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(cfg.elevated_locations, ElevatedLocationPolicy::Omit);
    }

    #[test]
    fn default_identity_is_decoded() {
        let mut pairs = base();
        let raw = r#"{"username":"svc","first_name":"S","last_name":"V","organisation_id":3,"user_type":"USER","locations":"1|||2"}"#;
        pairs.push((ENV_DEFAULT_IDENTITY, raw));
        let cfg = ServiceConfig::load_with(&[], env(&pairs)).unwrap();
        let id = cfg.default_identity.unwrap();
        assert_eq!(id.organisation_id, 3);
        assert_eq!(id.locations.as_slice(), &[1, 2]);

        let mut bad = base();
        bad.push((ENV_DEFAULT_IDENTITY, r#"{"username":"svc"}"#));
        assert!(matches!(ServiceConfig::load_with(&[], env(&bad)), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut pairs = base();
        pairs.push((ENV_HTTP_PORT, "http"));
        assert!(matches!(ServiceConfig::load_with(&[], env(&pairs)), Err(ConfigError::Invalid { name: ENV_HTTP_PORT, .. })));
    }
}
