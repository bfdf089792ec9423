use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::report::PriceSchedule;

/// Centralized configuration for the polirate service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub reports: PriceSchedule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind to
    pub bind: SocketAddr,
    /// Allow any CORS origin
    pub cors_permissive: bool,
    /// Allowed origins when not permissive
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// PostgreSQL connection string; `${VAR}` references are expanded
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: Option<String>,
}

/// Secrets shorter than this are accepted but logged as weak
const MIN_SECRET_LEN: usize = 32;

impl PlatformConfig {
    /// Load config from `path`, `$POLIRATE_CONFIG`, or `~/.polirate/config.toml`,
    /// then apply environment overrides.
    ///
    /// An explicitly named file must exist; the default location may be absent,
    /// in which case built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var("POLIRATE_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    tracing::debug!(path = %default_path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).context("Failed to parse config file (invalid TOML)")
    }

    /// Get default config file path: ~/.polirate/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".polirate/config.toml")
    }

    /// Apply environment overrides through `get` and expand `${VAR}` references.
    pub fn apply_env<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(bind) = get("POLIRATE_BIND") {
            self.server.bind = bind
                .parse()
                .with_context(|| format!("POLIRATE_BIND is not a socket address: {}", bind))?;
        }
        if let Some(flag) = get("POLIRATE_CORS_PERMISSIVE") {
            self.server.cors_permissive = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Some(max) = get("POLIRATE_MAX_CONNECTIONS") {
            self.database.max_connections = max
                .parse()
                .with_context(|| format!("POLIRATE_MAX_CONNECTIONS is not a number: {}", max))?;
        }
        if let Some(secret) = get("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }

        let mut vars = HashMap::new();
        for key in ["HOME", "PGUSER", "PGPASSWORD", "PGHOST", "PGDATABASE"] {
            vars.insert(key.to_string(), get(key).unwrap_or_default());
        }
        if let Some(url) = self.database.url.as_mut() {
            *url = Self::expand_string(url, &vars);
        }

        Ok(())
    }

    /// Expand ${var} references in a string
    fn expand_string(s: &str, vars: &HashMap<String, String>) -> String {
        let mut result = s.to_string();

        for (key, value) in vars {
            let pattern = format!("${{{}}}", key);
            result = result.replace(&pattern, value);
        }

        result
    }

    /// Database URL, failing with an actionable message when unset.
    pub fn database_url(&self) -> Result<&str> {
        self.database.url.as_deref().context(
            "database url not set. Set DATABASE_URL, [database] url in the config file, or pass --database-url",
        )
    }

    /// JWT secret, failing with an actionable message when unset.
    pub fn jwt_secret(&self) -> Result<&str> {
        let secret = self
            .auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("JWT secret not set. Set JWT_SECRET or [auth] jwt_secret in the config file")?;

        if secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                len = secret.len(),
                "JWT secret is shorter than {} bytes",
                MIN_SECRET_LEN
            );
        }
        Ok(secret)
    }

    /// Save config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(path, toml_str)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = PlatformConfig::default();
        assert_eq!(config.server.bind.port(), 3030);
        assert!(!config.server.cors_permissive);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.reports, PriceSchedule::default());
        assert!(config.database_url().is_err());
        assert!(config.jwt_secret().is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let config: PlatformConfig = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:8080"

            [reports]
            base = 3000000
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.reports.base, 3_000_000);
        assert_eq!(config.reports.step, 100_000);
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn env_overrides_file() {
        let mut config = PlatformConfig::default();
        config
            .apply_env(env_of(&[
                ("DATABASE_URL", "postgres://${PGUSER}@db/polirate"),
                ("PGUSER", "app"),
                ("POLIRATE_BIND", "0.0.0.0:9000"),
                ("POLIRATE_CORS_PERMISSIVE", "true"),
                ("POLIRATE_MAX_CONNECTIONS", "4"),
                ("JWT_SECRET", "s3cret"),
            ]))
            .unwrap();

        assert_eq!(config.database_url().unwrap(), "postgres://app@db/polirate");
        assert_eq!(config.server.bind.port(), 9000);
        assert!(config.server.cors_permissive);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.jwt_secret().unwrap(), "s3cret");
    }

    #[test]
    fn bad_env_values_fail() {
        let mut config = PlatformConfig::default();
        assert!(config
            .apply_env(env_of(&[("POLIRATE_BIND", "not an address")]))
            .is_err());
        assert!(config
            .apply_env(env_of(&[("POLIRATE_MAX_CONNECTIONS", "many")]))
            .is_err());
    }

    #[test]
    fn save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let mut config = PlatformConfig::default();
        config.database.url = Some("postgres://localhost/polirate".into());
        config.save(&path).unwrap();

        let loaded = PlatformConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(PlatformConfig::load(Some(&missing)).is_err());
    }
}
