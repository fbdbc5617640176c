//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use wallet_repo::security::MIN_SECRET_LEN;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub paystack_secret_key: String,
    pub paystack_base_url: Option<String>,
    pub ledger_signing_secret: String,
    pub service_api_token: String,
    pub gateway_timeout: Duration,
    pub payment_callback_url: Option<String>,
    pub promo_dedup_window: Duration,
    pub sweep_interval: Duration,
    pub sweep_min_age: Duration,
    pub sweep_batch_size: i64,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("paystack_base_url", &self.paystack_base_url)
            .field("gateway_timeout", &self.gateway_timeout)
            .field("payment_callback_url", &self.payment_callback_url)
            .field("promo_dedup_window", &self.promo_dedup_window)
            .field("sweep_interval", &self.sweep_interval)
            .field("sweep_min_age", &self.sweep_min_age)
            .field("sweep_batch_size", &self.sweep_batch_size)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let ledger_signing_secret = required("LEDGER_SIGNING_SECRET")?;
        if ledger_signing_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("LEDGER_SIGNING_SECRET must be at least {MIN_SECRET_LEN} bytes");
        }

        Ok(Self {
            port: parsed("PORT", 3000)?,
            database_url: required("DATABASE_URL")?,
            paystack_secret_key: required("PAYSTACK_SECRET_KEY")?,
            paystack_base_url: optional("PAYSTACK_BASE_URL"),
            ledger_signing_secret,
            service_api_token: required("SERVICE_API_TOKEN")?,
            gateway_timeout: Duration::from_secs(parsed("GATEWAY_TIMEOUT_SECS", 15)?),
            payment_callback_url: optional("PAYMENT_CALLBACK_URL"),
            promo_dedup_window: Duration::from_secs(parsed("PROMO_DEDUP_WINDOW_SECS", 300)?),
            sweep_interval: Duration::from_secs(parsed("SWEEP_INTERVAL_SECS", 60)?),
            sweep_min_age: Duration::from_secs(parsed("SWEEP_MIN_AGE_SECS", 120)?),
            sweep_batch_size: parsed("SWEEP_BATCH_SIZE", 50)?,
            log_format: log_format(),
        })
    }
}

/// Reads only `LOG_FORMAT`, so logging can start before the rest is validated.
pub fn log_format() -> LogFormat {
    match optional("LOG_FORMAT").as_deref() {
        Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    optional(name).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}={}: {}", name, raw, e)),
        None => Ok(default),
    }
}
