use anyhow::{Context, Result};

use crate::store::SeedPolicy;

const DEFAULT_LOCAL_STORE_DIR: &str = ".jobflow";

/// Application configuration loaded from environment variables.
/// Every backend is optional; missing ones fall back to local variants.
#[derive(Debug, Clone)]
pub struct Config {
    /// Selects the PostgreSQL backend when set.
    pub database_url: Option<String>,
    pub local_store_dir: String,
    /// Selects hosted auth when set.
    pub auth_url: Option<String>,
    pub auth_api_key: String,
    /// Checked per AI call, not at startup.
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub seed_policy: SeedPolicy,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: optional("DATABASE_URL"),
            local_store_dir: optional("LOCAL_STORE_DIR")
                .unwrap_or_else(|| DEFAULT_LOCAL_STORE_DIR.to_string()),
            auth_url: optional("AUTH_URL"),
            auth_api_key: optional("AUTH_API_KEY").unwrap_or_default(),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_base_url: optional("GEMINI_BASE_URL"),
            seed_policy: match optional("SEED_DEMO_DATA") {
                Some(flag) => parse_flag(&flag)
                    .with_context(|| format!("SEED_DEMO_DATA must be true or false, got '{flag}'"))?,
                None => SeedPolicy::Blank,
            },
            port: optional("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_flag(raw: &str) -> Option<SeedPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(SeedPolicy::Demo),
        "0" | "false" | "no" | "off" => Some(SeedPolicy::Blank),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_select_local_backends() {
        let config = config_from(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert!(config.auth_url.is_none());
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.local_store_dir, ".jobflow");
        assert_eq!(config.seed_policy, SeedPolicy::Blank);
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("DATABASE_URL", "  "), ("GEMINI_API_KEY", "")]).unwrap();
        assert!(config.database_url.is_none());
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_seed_flag_and_port_parsing() {
        let config = config_from(&[("SEED_DEMO_DATA", "TRUE"), ("PORT", "9000")]).unwrap();
        assert_eq!(config.seed_policy, SeedPolicy::Demo);
        assert_eq!(config.port, 9000);

        assert!(config_from(&[("SEED_DEMO_DATA", "maybe")]).is_err());
        assert!(config_from(&[("PORT", "http")]).is_err());
    }
}
