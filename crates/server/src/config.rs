use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

/// Server configuration, read from a TOML file with environment overrides.
/// Every field has a default so the server starts with no file at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub db_path: PathBuf,
    pub blob_dir: PathBuf,
    /// Shared API token. Auth stays on with no token configured, which
    /// makes every protected route answer 503 until one is set.
    pub api_token: Option<String>,
    pub auth_enabled: bool,
    pub default_currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            db_path: PathBuf::from("data/plant.db"),
            blob_dir: PathBuf::from("data/blobs"),
            api_token: None,
            auth_enabled: true,
            default_currency: "KGS".to_string(),
        }
    }
}

impl Config {
    /// Loads `batchplant.toml` (or `$BATCHPLANT_CONFIG`) when present, then
    /// applies environment overrides on top.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("BATCHPLANT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("batchplant.toml"));

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        } else {
            Config::default()
        };

        if let Ok(v) = std::env::var("BATCHPLANT_LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Ok(v) = std::env::var("BATCHPLANT_DB_PATH") {
            config.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BATCHPLANT_BLOB_DIR") {
            config.blob_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BATCHPLANT_API_TOKEN") {
            if !v.is_empty() {
                config.api_token = Some(v);
            }
        }
        if let Ok(v) = std::env::var("BATCHPLANT_AUTH_ENABLED") {
            config.auth_enabled = !matches!(v.as_str(), "0" | "false" | "no");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let c = Config::default();
        assert!(c.auth_enabled);
        assert!(c.api_token.is_none());
        assert_eq!(c.default_currency, "KGS");
    }

    #[test]
    fn toml_overrides_defaults() {
        let c: Config = toml::from_str(
            r#"
            listen_addr = "127.0.0.1:9000"
            api_token = "secret"
            default_currency = "USD"
            "#,
        )
        .unwrap();
        assert_eq!(c.listen_addr, "127.0.0.1:9000");
        assert_eq!(c.api_token.as_deref(), Some("secret"));
        assert_eq!(c.default_currency, "USD");
        assert_eq!(c.db_path, PathBuf::from("data/plant.db"));
    }
}
