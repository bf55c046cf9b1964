//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::handlers;
use crate::middleware::auth_middleware;
use crate::services::{
    CheckoutService, JwtVerifier, MongoPaymentStore, MongoProductCatalog, PaymentStore,
    ProductCatalog, RazorpayClient, SignatureVerifier,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub checkout: CheckoutService,
    pub store: Arc<dyn PaymentStore>,
    pub jwt: JwtVerifier,
}

impl AppState {
    /// Wire the checkout service from its collaborators.
    pub fn new(
        config: Config,
        store: Arc<dyn PaymentStore>,
        catalog: Option<Arc<dyn ProductCatalog>>,
    ) -> Self {
        let gateway = RazorpayClient::new(config.razorpay.clone());
        if gateway.is_configured() {
            tracing::info!("Razorpay client initialized");
        } else {
            tracing::warn!("Razorpay credentials not configured - checkout will fail");
        }

        let checkout = CheckoutService::new(
            gateway,
            SignatureVerifier::new(config.razorpay.signature_secret.clone()),
            store.clone(),
            catalog,
            config.checkout.currency.clone(),
        );
        let jwt = JwtVerifier::new(&config.auth.jwt_secret);

        Self {
            config,
            checkout,
            store,
            jwt,
        }
    }
}

/// Build the HTTP router. Payment routes are served at the root and under `/api`.
pub fn build_router(state: AppState) -> Router {
    let payments = Router::new()
        .route("/checkout", post(handlers::payments::checkout))
        .route("/getkey", get(handlers::payments::get_key))
        .route(
            "/paymentverification",
            post(handlers::payments::verify_payment),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .merge(payments.clone())
        .nest("/api", payments)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to MongoDB and build the application.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                e
            })?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let store = MongoPaymentStore::new(&db);
        store.init_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let catalog: Option<Arc<dyn ProductCatalog>> = if config.checkout.verify_product {
            Some(Arc::new(MongoProductCatalog::new(&db)))
        } else {
            tracing::info!("Product existence check disabled");
            None
        };

        let state = AppState::new(config.clone(), Arc::new(store), catalog);
        Self::from_state(config, state).await
    }

    /// Bind the listener for an already wired state (port 0 picks a free port).
    pub async fn from_state(config: Config, state: AppState) -> anyhow::Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            e
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Checkout service: HTTP on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
