use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub cors_origin: String,
    pub default_photo: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("WEAVE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("WEAVE_JWT_SECRET is unset or still a placeholder");
        }

        let port = var("WEAVE_PORT", "3000");
        let port: u16 = port
            .parse()
            .with_context(|| format!("WEAVE_PORT '{}' is not a valid port", port))?;

        let ttl = var("WEAVE_TOKEN_TTL_SECS", "3600");
        let token_ttl_secs: u64 = ttl
            .parse()
            .with_context(|| format!("WEAVE_TOKEN_TTL_SECS '{}' is not a number", ttl))?;
        if token_ttl_secs == 0 {
            bail!("WEAVE_TOKEN_TTL_SECS must be positive");
        }

        Ok(Self {
            host: var("WEAVE_HOST", "0.0.0.0"),
            port,
            db_path: var("WEAVE_DB_PATH", "weave.db").into(),
            jwt_secret,
            token_ttl_secs,
            cors_origin: var("WEAVE_CORS_ORIGIN", "http://localhost:5173"),
            default_photo: var("WEAVE_DEFAULT_PROFILE_PHOTO", "/static/default-profile.png"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("WEAVE_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("weave.db"));
        assert_eq!(config.token_ttl_secs, 3600);
        assert_eq!(config.cors_origin, "http://localhost:5173");
        assert_eq!(config.default_photo, "/static/default-profile.png");
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(load(&[]).is_err());
        assert!(load(&[("WEAVE_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let secret = ("WEAVE_JWT_SECRET", "a-real-secret");
        assert!(load(&[secret, ("WEAVE_PORT", "http")]).is_err());
        assert!(load(&[secret, ("WEAVE_TOKEN_TTL_SECS", "0")]).is_err());

        let config = load(&[secret, ("WEAVE_PORT", "8080"), ("WEAVE_TOKEN_TTL_SECS", "60")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.token_ttl_secs, 60);
    }
}
