use anyhow::{Context, Result};
use url::Url;

use crate::chart::ColorScheme;
use crate::stats::TimeRange;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base of the institutional API, e.g. `https://learn.zone01kisumu.ke/api/`.
    pub api_base: String,
    /// Event (cohort) identifier every scoped query filters on.
    pub event_id: i64,
    pub storage_path: String,
    pub token_key: String,
    pub request_timeout_secs: u64,
    pub default_range: TimeRange,
    pub out_dir: String,
    pub theme: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("PROFILE_API_BASE").unwrap_or_else(|_| "https://learn.zone01kisumu.ke/api/".to_string()),
            event_id: std::env::var("PROFILE_EVENT_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(75),
            storage_path: std::env::var("PROFILE_STORAGE_PATH").unwrap_or_else(|_| "./profiledash.json".to_string()),
            token_key: std::env::var("PROFILE_TOKEN_KEY").unwrap_or_else(|_| "jwt_token".to_string()),
            request_timeout_secs: std::env::var("PROFILE_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
            default_range: std::env::var("PROFILE_RANGE").ok().and_then(|v| TimeRange::parse(&v)).unwrap_or(TimeRange::Months(1)),
            out_dir: std::env::var("PROFILE_OUT_DIR").unwrap_or_else(|_| "out/dashboard".to_string()),
            theme: std::env::var("PROFILE_THEME").unwrap_or_else(|_| "light".to_string()),
        }
    }

    /// Same defaults as `from_env`, pointed at an arbitrary API base.
    pub fn with_api_base(api_base: &str) -> Self {
        Self {
            api_base: api_base.to_string(),
            event_id: 75,
            storage_path: "./profiledash.json".to_string(),
            token_key: "jwt_token".to_string(),
            request_timeout_secs: 10,
            default_range: TimeRange::Months(1),
            out_dir: "out/dashboard".to_string(),
            theme: "light".to_string(),
        }
    }

    fn base_url(&self) -> Result<Url> {
        let mut base = self.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base).with_context(|| format!("invalid api base {}", self.api_base))
    }

    pub fn graphql_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join("graphql-engine/v1/graphql")?)
    }

    pub fn signin_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join("auth/signin")?)
    }

    pub fn colors(&self) -> ColorScheme {
        match self.theme.as_str() {
            "dark" => ColorScheme::dark(),
            _ => ColorScheme::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_onto_base_with_or_without_slash() {
        let cfg = Config::with_api_base("https://example.org/api");
        assert_eq!(cfg.graphql_url().unwrap().as_str(), "https://example.org/api/graphql-engine/v1/graphql");
        assert_eq!(cfg.signin_url().unwrap().as_str(), "https://example.org/api/auth/signin");

        let cfg = Config::with_api_base("https://example.org/api/");
        assert_eq!(cfg.signin_url().unwrap().as_str(), "https://example.org/api/auth/signin");
    }

    #[test]
    fn rejects_garbage_base() {
        let cfg = Config::with_api_base("not a url");
        assert!(cfg.graphql_url().is_err());
    }
}
