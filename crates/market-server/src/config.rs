use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub listing_ttl_days: i64,
    pub admin_usernames: Vec<String>,
    pub mail_webhook_url: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("MARKET_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("MARKET_JWT_SECRET is unset or still a placeholder");
        }

        let host = var("MARKET_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("MARKET_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("MARKET_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("MARKET_HOST must be an IP address")?;

        let listing_ttl_days: i64 = match var("MARKET_LISTING_TTL_DAYS") {
            Some(v) => v.parse().context("MARKET_LISTING_TTL_DAYS must be a number of days")?,
            None => 90,
        };
        if listing_ttl_days < 1 {
            bail!("MARKET_LISTING_TTL_DAYS must be at least 1");
        }

        let admin_usernames = var("MARKET_ADMIN_USERS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            addr,
            db_path: var("MARKET_DB_PATH").unwrap_or_else(|| "market.db".into()).into(),
            jwt_secret,
            listing_ttl_days,
            admin_usernames,
            mail_webhook_url: var("MARKET_MAIL_WEBHOOK_URL").filter(|v| !v.trim().is_empty()),
            mail_from: var("MARKET_MAIL_FROM").unwrap_or_else(|| "noreply@market.local".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = load(&[("MARKET_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.db_path, PathBuf::from("market.db"));
        assert_eq!(config.listing_ttl_days, 90);
        assert!(config.admin_usernames.is_empty());
        assert!(config.mail_webhook_url.is_none());
    }

    #[test]
    fn placeholder_secrets_are_refused() {
        assert!(load(&[]).is_err());
        assert!(load(&[("MARKET_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn admin_list_is_comma_separated() {
        let config = load(&[
            ("MARKET_JWT_SECRET", "s3cret"),
            ("MARKET_ADMIN_USERS", " alice, bob ,,"),
            ("MARKET_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.admin_usernames, vec!["alice", "bob"]);
        assert_eq!(config.addr.port(), 8080);
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(load(&[("MARKET_JWT_SECRET", "s"), ("MARKET_PORT", "http")]).is_err());
        assert!(load(&[("MARKET_JWT_SECRET", "s"), ("MARKET_LISTING_TTL_DAYS", "0")]).is_err());
    }
}
