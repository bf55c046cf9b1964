#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use checkout_service::config::{
    AuthConfig, CheckoutConfig, Config, DatabaseConfig, ObservabilityConfig, RazorpayConfig,
    ServerConfig,
};
use checkout_service::services::{
    InMemoryPaymentStore, MarketplaceClaims, PaymentStore, ProductCatalog, SignatureVerifier,
};
use checkout_service::{AppState, Application};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use wiremock::MockServer;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_KEY_ID: &str = "rzp_test_key";
pub const TEST_KEY_SECRET: &str = "rzp_test_secret";
pub const TEST_BUYER: &str = "buyer@college.edu";
pub const KNOWN_PRODUCT: &str = "64b0c0ffee0000000000beef";

/// Catalog holding a fixed set of product ids.
pub struct StaticCatalog(pub Vec<String>);

#[async_trait]
impl ProductCatalog for StaticCatalog {
    async fn product_exists(&self, product_id: &str) -> anyhow::Result<bool> {
        Ok(self.0.iter().any(|id| id == product_id))
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<InMemoryPaymentStore>,
    pub razorpay: MockServer,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_key_id(TEST_KEY_ID).await
    }

    pub async fn spawn_with_key_id(key_id: &str) -> Self {
        let razorpay = MockServer::start().await;

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new("mongodb://unused".to_string()),
                db_name: "checkout_test".to_string(),
            },
            razorpay: RazorpayConfig {
                key_id: key_id.to_string(),
                key_secret: Secret::new(TEST_KEY_SECRET.to_string()),
                signature_secret: Secret::new(TEST_KEY_SECRET.to_string()),
                api_base_url: razorpay.uri(),
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()),
            },
            checkout: CheckoutConfig {
                currency: "INR".to_string(),
                verify_product: true,
            },
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                otlp_endpoint: None,
            },
            service_name: "checkout-service-test".to_string(),
        };

        let store = Arc::new(InMemoryPaymentStore::new());
        let catalog: Arc<dyn ProductCatalog> =
            Arc::new(StaticCatalog(vec![KNOWN_PRODUCT.to_string()]));
        let state = AppState::new(
            config.clone(),
            store.clone() as Arc<dyn PaymentStore>,
            Some(catalog),
        );

        let app = Application::from_state(config, state)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
            store,
            razorpay,
            client: reqwest::Client::new(),
        }
    }

    /// Bearer token for the default test buyer.
    pub fn token(&self) -> String {
        mint_token(TEST_JWT_SECRET, TEST_BUYER, Duration::hours(1))
    }

    /// Signature the gateway would hand back for this order/payment pair.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        SignatureVerifier::new(Secret::new(TEST_KEY_SECRET.to_string()))
            .sign(order_id, payment_id)
            .expect("Failed to sign")
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(self.token())
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(self.token())
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn mint_token(secret: &str, email: &str, ttl: Duration) -> String {
    let now = Utc::now();
    let claims = MarketplaceClaims {
        user_id: "64b0c0ffee0000000000cafe".to_string(),
        user_email: email.to_string(),
        exp: (now + ttl).timestamp(),
        iat: Some(now.timestamp()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to mint token")
}

/// A gateway order body as Razorpay returns it.
pub fn order_body(id: &str, amount: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "entity": "order",
        "amount": amount,
        "amount_paid": 0,
        "amount_due": amount,
        "currency": "INR",
        "receipt": "receipt_1",
        "status": "created",
        "attempts": 0,
        "notes": { "productId": KNOWN_PRODUCT },
        "created_at": 1700000000
    })
}
