use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::kernel::GeoRankingKind;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means in-memory stores (development only)
    pub database_url: Option<String>,
    /// Absent means the in-process event hub
    pub nats_url: Option<String>,
    pub geo_ranking: GeoRankingKind,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub payment_currency: String,
    /// Empty allows any origin
    pub allowed_origins: Vec<String>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let config = Self {
            database_url: optional("DATABASE_URL"),
            nats_url: optional("NATS_URL"),
            geo_ranking: optional("GEO_RANKING")
                .map(|v| v.parse())
                .transpose()
                .context("GEO_RANKING must be haversine or postgres")?
                .unwrap_or_default(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: optional("JWT_ISSUER").unwrap_or_else(|| "foodradar".to_string()),
            stripe_secret_key: optional("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            payment_currency: optional("PAYMENT_CURRENCY")
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or_else(|| "usd".to_string()),
            allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects setting combinations that would run in a degraded or unsafe mode.
    pub fn validate(&self) -> Result<()> {
        if self.stripe_secret_key.is_some() && self.stripe_webhook_secret.is_none() {
            bail!("STRIPE_WEBHOOK_SECRET must be set when STRIPE_SECRET_KEY is set");
        }
        if self.geo_ranking == GeoRankingKind::Postgres && self.database_url.is_none() {
            bail!("GEO_RANKING=postgres requires DATABASE_URL");
        }
        Ok(())
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
