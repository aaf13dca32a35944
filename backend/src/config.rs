//! Gateway configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present). The CLI may override a few of them after loading.

use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default SQLite location (relative to current dir)
const DEFAULT_DB_PATH: &str = ".gateway/artifacts.db";

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Process-wide settings, built once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayConfig {
    pub port: u16,
    /// SQLite file backing the artifact log (`:memory:` for an ephemeral log)
    pub db_path: PathBuf,
    pub reasoner: ReasonerConfig,
    pub limits: Limits,
    /// Show built-in descriptors when no analyzer is registered
    pub fallback_domains: bool,
    /// Surface artifact listing failures instead of returning an empty list
    pub strict_listing: bool,
    pub max_upload_bytes: usize,
}

/// Settings for the generic reasoner backend.
#[derive(Debug, Clone, Serialize)]
pub struct ReasonerConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Caps applied to extracted content and listings.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    /// Maximum data rows kept per table or sheet
    pub max_rows: usize,
    /// Maximum characters of extracted text sent to the reasoner
    pub text_budget: usize,
    /// Default number of artifacts returned by a listing
    pub list_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rows: 200,
            text_budget: 8000,
            list_limit: 200,
        }
    }
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            reasoner: ReasonerConfig::default(),
            limits: Limits::default(),
            fallback_domains: true,
            strict_listing: false,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl GatewayConfig {
    /// Load from process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(&env::vars().collect())
    }

    /// Load from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let port = match get("GATEWAY_PORT").or_else(|| get("PORT")) {
            Some(v) => parse_value("GATEWAY_PORT", v)?,
            None => defaults.port,
        };

        let reasoner = ReasonerConfig {
            api_key: get("ANTHROPIC_API_KEY").map(str::to_string),
            model: get("ANTHROPIC_MODEL")
                .map(str::to_string)
                .unwrap_or(defaults.reasoner.model),
            base_url: get("ANTHROPIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.reasoner.base_url),
            max_tokens: parse_or(&get, "REASONER_MAX_TOKENS", defaults.reasoner.max_tokens)?,
            timeout_secs: parse_or(&get, "REASONER_TIMEOUT_SECS", defaults.reasoner.timeout_secs)?,
        };

        let limits = Limits {
            max_rows: parse_or(&get, "GATEWAY_MAX_ROWS", defaults.limits.max_rows)?,
            text_budget: parse_or(&get, "GATEWAY_TEXT_BUDGET", defaults.limits.text_budget)?,
            list_limit: parse_or(&get, "GATEWAY_LIST_LIMIT", defaults.limits.list_limit)?,
        };

        Ok(Self {
            port,
            db_path: get("GATEWAY_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            reasoner,
            limits,
            fallback_domains: parse_flag(&get, "GATEWAY_FALLBACK_DOMAINS", defaults.fallback_domains)?,
            strict_listing: parse_flag(&get, "GATEWAY_STRICT_LISTING", defaults.strict_listing)?,
            max_upload_bytes: parse_or(&get, "GATEWAY_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_or<'a, T, F>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<&'a str>,
{
    match get(key) {
        Some(v) => parse_value(key, v),
        None => Ok(default),
    }
}

fn parse_flag<'a, F>(get: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<&'a str>,
{
    match get(key).map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}
