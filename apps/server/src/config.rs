use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;
use eventhub_core::constants::{
    DEFAULT_CATALOG_PAGE_SIZE, DEFAULT_EVENTS_LIMIT, DEFAULT_EVENTS_MAX_LIMIT,
    DEFAULT_EVENTS_MIN_LIMIT,
};
use eventhub_core::events::EventQueryLimits;
use eventhub_paychangu::{PayChanguConfig, DEFAULT_PAYCHANGU_API_URL};

use crate::auth::decode_secret_key;

/// Catalog sync runs every 6 hours unless configured otherwise.
const DEFAULT_CATALOG_SYNC_INTERVAL_SECS: u64 = 6 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub jwt_secret: Vec<u8>,
    pub token_ttl: Duration,
    pub paychangu: PayChanguConfig,
    pub catalog_page_size: u32,
    pub event_limits: EventQueryLimits,
    /// Zero disables the background catalog sync.
    pub catalog_sync_interval: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: {raw}")),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = env_or("EH_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid EH_LISTEN_ADDR")?;
        let db_path = env_or("EH_DB_PATH", "./db/app.db");
        let cors_allow = env_or("EH_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = parse_env("EH_REQUEST_TIMEOUT_MS", 30_000)?;

        let raw_secret =
            std::env::var("EH_JWT_SECRET").context("EH_JWT_SECRET must be set")?;
        let jwt_secret = decode_secret_key(&raw_secret)?;
        let token_ttl_secs: u64 = parse_env("EH_TOKEN_TTL_SECS", 86_400)?;

        let paychangu = PayChanguConfig {
            base_url: env_or("PAYCHANGU_API_URL", DEFAULT_PAYCHANGU_API_URL),
            secret_key: env_or("PAYCHANGU_SECRET_KEY", ""),
            callback_url: env_or("EH_PAYMENT_CALLBACK_URL", ""),
            return_url: env_or("EH_PAYMENT_RETURN_URL", ""),
        };
        if paychangu.secret_key.is_empty() {
            tracing::warn!("PAYCHANGU_SECRET_KEY is not set; catalog and checkout calls will be rejected upstream");
        }

        let event_limits = EventQueryLimits {
            min_limit: parse_env("EH_EVENTS_MIN_LIMIT", DEFAULT_EVENTS_MIN_LIMIT)?,
            max_limit: parse_env("EH_EVENTS_MAX_LIMIT", DEFAULT_EVENTS_MAX_LIMIT)?,
            default_limit: parse_env("EH_EVENTS_DEFAULT_LIMIT", DEFAULT_EVENTS_LIMIT)?,
        };
        let sync_secs: u64 = parse_env(
            "EH_CATALOG_SYNC_INTERVAL_SECS",
            DEFAULT_CATALOG_SYNC_INTERVAL_SECS,
        )?;

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_secs),
            paychangu,
            catalog_page_size: parse_env("EH_CATALOG_PAGE_SIZE", DEFAULT_CATALOG_PAGE_SIZE)?,
            event_limits,
            catalog_sync_interval: Duration::from_secs(sync_secs),
        })
    }
}
