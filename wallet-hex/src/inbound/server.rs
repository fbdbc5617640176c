//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wallet_types::{PaymentGateway, PaymentStore, WalletStore};

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use crate::openapi::ApiDoc;
use crate::webhook::WebhookIngestion;
use crate::ReconciliationEngine;

/// HTTP Server for the wallet API.
pub struct HttpServer<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    state: Arc<AppState<S, G>>,
}

impl<S, G> HttpServer<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    /// Creates a new HTTP server around the engine.
    pub fn new(engine: Arc<ReconciliationEngine<S, G>>, api_token: impl Into<String>) -> Self {
        Self {
            state: Arc::new(AppState {
                webhooks: WebhookIngestion::new(engine.clone()),
                engine,
                api_token: api_token.into(),
            }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/api/payments/initialize",
                post(handlers::initialize_payment::<S, G>),
            )
            .route(
                "/api/payments/{reference}/verify",
                get(handlers::verify_payment::<S, G>),
            )
            .route(
                "/api/webhooks/paystack",
                post(handlers::paystack_webhook::<S, G>),
            )
            .route("/api/wallets/{id}", get(handlers::get_balance::<S, G>))
            .route(
                "/api/wallets/{id}/entries",
                get(handlers::list_entries::<S, G>),
            )
            .route("/api/wallets/{id}/debit", post(handlers::debit::<S, G>))
            .route("/api/wallets/{id}/refund", post(handlers::refund::<S, G>))
            .route(
                "/api/wallets/{id}/promo",
                post(handlers::credit_promo::<S, G>),
            )
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<S, G>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
