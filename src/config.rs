use anyhow::{Context, Result};
use std::path::PathBuf;

/// Runtime configuration loaded from environment variables.
///
/// | Env Var          | Default     |
/// |------------------|-------------|
/// | `ROSTER_DB_PATH` | `roster.db` |
/// | `HOST`           | `0.0.0.0`   |
/// | `PORT`           | `3000`      |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("roster.db"),
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Config {
    /// Load from the process environment (after reading `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let db_path = lookup("ROSTER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid u16, got {:?}", raw))?,
            None => defaults.port,
        };

        Ok(Config { db_path, host, port })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ROSTER_DB_PATH", "/tmp/team.db"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/team.db"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_port() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
    }
}
