//! # Wallet Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the SQLite store and the integrity signer
//! - Build the Paystack gateway, reconciliation engine and wallet ledger
//! - Start the reconciliation sweep and the HTTP server

mod config;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, LogFormat};
use paystack_gateway::{PaystackClient, PaystackConfig};
use wallet_hex::{
    EngineConfig, ReconciliationEngine, ReconciliationSweep, SweepConfig, WalletLedger,
    inbound::HttpServer,
};
use wallet_repo::{IntegritySigner, build_store};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,wallet_app=debug,wallet_hex=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing(config::log_format());

    let config = Config::from_env()?;
    tracing::info!("Starting wallet server on port {}", config.port);
    tracing::debug!(?config, "Loaded configuration");

    // Build store (handles connection and migration)
    let store = Arc::new(build_store(&config.database_url).await?);

    let signer = Arc::new(IntegritySigner::new(config.ledger_signing_secret.as_bytes())?);

    let mut paystack = PaystackConfig::new(config.paystack_secret_key.clone())
        .with_timeout(config.gateway_timeout);
    if let Some(base_url) = &config.paystack_base_url {
        paystack = paystack.with_base_url(base_url.clone());
    }
    let gateway = Arc::new(PaystackClient::new(paystack)?);

    let ledger = Arc::new(
        WalletLedger::new(store.clone(), signer)
            .with_promo_dedup_window(config.promo_dedup_window),
    );
    let engine = Arc::new(ReconciliationEngine::new(
        store,
        gateway,
        ledger,
        EngineConfig {
            gateway_timeout: config.gateway_timeout,
            default_callback_url: config.payment_callback_url.clone(),
        },
    ));

    let sweep = ReconciliationSweep::new(
        engine.clone(),
        SweepConfig {
            interval: config.sweep_interval,
            min_age: config.sweep_min_age,
            batch_size: config.sweep_batch_size,
        },
    );
    tokio::spawn(sweep.run());

    // Create and run the HTTP server
    let server = HttpServer::new(engine, config.service_api_token.clone());
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    Ok(())
}
