//! Runtime configuration read from `REGISTRAR_*` environment variables.

use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_API_HOST: &str = "localhost";
pub const DEFAULT_API_PORT: u16 = 8080;
pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    /// Host of the records API.
    pub api_host: String,
    pub api_port: u16,
    /// Port the front-end server listens on.
    pub http_port: u16,
    pub session_ttl: Duration,
    /// Per-request timeout for API calls; unset means no timeout.
    pub request_timeout: Option<Duration>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            http_port: DEFAULT_HTTP_PORT,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            request_timeout: None,
        }
    }
}

fn parse_num<T: std::str::FromStr>(name: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::config(format!("invalid_{}", name.to_lowercase()), format!("{}='{}' is not a valid number", name, raw)))
}

impl PortalConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> AppResult<Self> {
        let mut cfg = PortalConfig::default();
        if let Some(v) = get("REGISTRAR_API_HOST") {
            if v.trim().is_empty() {
                return Err(AppError::config("invalid_registrar_api_host", "REGISTRAR_API_HOST is empty"));
            }
            cfg.api_host = v.trim().to_string();
        }
        if let Some(v) = get("REGISTRAR_API_PORT") { cfg.api_port = parse_num("REGISTRAR_API_PORT", &v)?; }
        if let Some(v) = get("REGISTRAR_HTTP_PORT") { cfg.http_port = parse_num("REGISTRAR_HTTP_PORT", &v)?; }
        if let Some(v) = get("REGISTRAR_SESSION_TTL_SECS") {
            cfg.session_ttl = Duration::from_secs(parse_num("REGISTRAR_SESSION_TTL_SECS", &v)?);
        }
        if let Some(v) = get("REGISTRAR_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_num("REGISTRAR_REQUEST_TIMEOUT_SECS", &v)?;
            cfg.request_timeout = if secs == 0 { None } else { Some(Duration::from_secs(secs)) };
        }
        Ok(cfg)
    }

    /// Base URL of the records API: a fixed host and port.
    pub fn api_base_url(&self) -> String {
        if self.api_host.starts_with("http://") || self.api_host.starts_with("https://") {
            format!("{}:{}", self.api_host.trim_end_matches('/'), self.api_port)
        } else {
            format!("http://{}:{}", self.api_host, self.api_port)
        }
    }
}
