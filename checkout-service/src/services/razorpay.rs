//! Razorpay payment provider client.
//!
//! Implements Razorpay's Orders API for payment initiation and
//! signature verification for payment confirmation.

use crate::config::RazorpayConfig;
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::utils::signature::{sign_hex, verify_hex};

/// Razorpay client for interacting with the Razorpay API.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

/// Request to create a Razorpay order.
#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in smallest currency unit (paise for INR).
    pub amount: u64,
    /// Currency code (e.g., "INR").
    pub currency: String,
    /// Receipt ID for tracking (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    /// Notes for the order (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<serde_json::Value>,
}

/// Order as returned by Razorpay. Passed through to the browser unchanged,
/// so the payment sheet can be opened with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    #[serde(default = "default_entity")]
    pub entity: String,
    /// Amount in smallest currency unit.
    pub amount: u64,
    #[serde(default)]
    pub amount_paid: u64,
    #[serde(default)]
    pub amount_due: u64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub notes: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: u64,
}

fn default_entity() -> String {
    "order".to_string()
}

/// Razorpay API error response.
#[derive(Debug, Deserialize)]
pub struct RazorpayError {
    pub error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayErrorDetail {
    pub code: String,
    pub description: String,
    pub source: Option<String>,
    pub step: Option<String>,
    pub reason: Option<String>,
}

/// Payment verification parameters.
#[derive(Debug, Clone)]
pub struct PaymentVerification {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Razorpay is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }

    /// Publishable key id for client-side checkout.
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    /// Create a new order in Razorpay.
    ///
    /// # Arguments
    /// * `amount` - Amount in smallest currency unit (paise for INR)
    /// * `currency` - Currency code (e.g., "INR")
    /// * `receipt` - Optional receipt ID for tracking
    /// * `notes` - Optional notes
    pub async fn create_order(
        &self,
        amount: u64,
        currency: &str,
        receipt: Option<String>,
        notes: Option<serde_json::Value>,
    ) -> Result<RazorpayOrder> {
        if !self.is_configured() {
            return Err(anyhow!("Razorpay credentials not configured"));
        }

        let request = CreateOrderRequest {
            amount,
            currency: currency.to_string(),
            receipt,
            notes,
        };

        let url = format!("{}/orders", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "Razorpay create_order response");

        if status.is_success() {
            let order: RazorpayOrder = serde_json::from_str(&body)?;
            tracing::info!(
                order_id = %order.id,
                amount = order.amount,
                currency = %order.currency,
                "Razorpay order created"
            );
            Ok(order)
        } else {
            let error: RazorpayError =
                serde_json::from_str(&body).unwrap_or_else(|_| RazorpayError {
                    error: RazorpayErrorDetail {
                        code: "UNKNOWN".to_string(),
                        description: body.clone(),
                        source: None,
                        step: None,
                        reason: None,
                    },
                });
            tracing::error!(
                status = %status,
                code = %error.error.code,
                description = %error.error.description,
                "Razorpay order creation failed"
            );
            Err(anyhow!(
                "Razorpay error: {} - {}",
                error.error.code,
                error.error.description
            ))
        }
    }
}

/// Checks the signature Razorpay's checkout hands back to the browser.
///
/// The signature is computed as:
/// `HMAC-SHA256(order_id + "|" + payment_id, secret)`, hex encoded.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Secret<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    /// Signature Razorpay would produce for this order/payment pair.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String> {
        sign_hex(
            self.secret.expose_secret(),
            &format!("{}|{}", order_id, payment_id),
        )
    }

    /// Constant-time check of the supplied signature.
    pub fn verify(&self, verification: &PaymentVerification) -> Result<bool> {
        let payload = format!(
            "{}|{}",
            verification.razorpay_order_id, verification.razorpay_payment_id
        );

        let is_valid = verify_hex(
            self.secret.expose_secret(),
            &payload,
            &verification.razorpay_signature,
        )?;

        if is_valid {
            tracing::info!(
                order_id = %verification.razorpay_order_id,
                payment_id = %verification.razorpay_payment_id,
                "Payment signature verified successfully"
            );
        } else {
            tracing::warn!(
                order_id = %verification.razorpay_order_id,
                payment_id = %verification.razorpay_payment_id,
                "Payment signature verification failed"
            );
        }

        Ok(is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_base_url: &str) -> RazorpayConfig {
        RazorpayConfig {
            key_id: "rzp_test_123".to_string(),
            key_secret: Secret::new("test_secret".to_string()),
            signature_secret: Secret::new("test_secret".to_string()),
            api_base_url: api_base_url.to_string(),
        }
    }

    #[test]
    fn test_is_configured() {
        let client = RazorpayClient::new(test_config("https://api.razorpay.com/v1"));
        assert!(client.is_configured());
        assert_eq!(client.key_id(), "rzp_test_123");

        let empty_config = RazorpayConfig {
            key_id: "".to_string(),
            key_secret: Secret::new("".to_string()),
            signature_secret: Secret::new("".to_string()),
            api_base_url: "".to_string(),
        };
        let client = RazorpayClient::new(empty_config);
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn test_create_order_posts_amount_with_basic_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/orders"))
            // base64("rzp_test_123:test_secret")
            .and(header(
                "authorization",
                "Basic cnpwX3Rlc3RfMTIzOnRlc3Rfc2VjcmV0",
            ))
            .and(body_json(serde_json::json!({
                "amount": 50000,
                "currency": "INR",
                "receipt": "receipt_1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order_abc",
                "entity": "order",
                "amount": 50000,
                "amount_paid": 0,
                "amount_due": 50000,
                "currency": "INR",
                "receipt": "receipt_1",
                "status": "created",
                "attempts": 0,
                "notes": [],
                "created_at": 1700000000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RazorpayClient::new(test_config(&server.uri()));
        let order = client
            .create_order(50000, "INR", Some("receipt_1".to_string()), None)
            .await
            .unwrap();

        assert_eq!(order.id, "order_abc");
        assert_eq!(order.amount, 50000);
        assert_eq!(order.status, "created");
    }

    #[tokio::test]
    async fn test_create_order_surfaces_gateway_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": "BAD_REQUEST_ERROR",
                    "description": "Order amount less than minimum amount allowed"
                }
            })))
            .mount(&server)
            .await;

        let client = RazorpayClient::new(test_config(&server.uri()));
        let err = client.create_order(1, "INR", None, None).await.unwrap_err();

        assert!(err.to_string().contains("BAD_REQUEST_ERROR"));
    }

    #[tokio::test]
    async fn test_unconfigured_client_skips_network() {
        let client = RazorpayClient::new(RazorpayConfig {
            key_id: "".to_string(),
            key_secret: Secret::new("".to_string()),
            signature_secret: Secret::new("".to_string()),
            api_base_url: "http://127.0.0.1:1".to_string(),
        });

        let err = client.create_order(100, "INR", None, None).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_payment_signature_verification() {
        let verifier = SignatureVerifier::new(Secret::new("my_secret_key".to_string()));
        let expected = verifier.sign("order_123", "pay_456").unwrap();

        let verification = PaymentVerification {
            razorpay_order_id: "order_123".to_string(),
            razorpay_payment_id: "pay_456".to_string(),
            razorpay_signature: expected,
        };

        assert!(verifier.verify(&verification).unwrap());
    }

    #[test]
    fn test_invalid_signature() {
        let verifier = SignatureVerifier::new(Secret::new("test_secret".to_string()));

        let verification = PaymentVerification {
            razorpay_order_id: "order_123".to_string(),
            razorpay_payment_id: "pay_456".to_string(),
            razorpay_signature: "invalid_signature".to_string(),
        };

        assert!(!verifier.verify(&verification).unwrap());
    }

    #[test]
    fn test_signature_bound_to_both_ids() {
        let verifier = SignatureVerifier::new(Secret::new("test_secret".to_string()));
        let signature = verifier.sign("order_123", "pay_456").unwrap();

        let swapped = PaymentVerification {
            razorpay_order_id: "order_123".to_string(),
            razorpay_payment_id: "pay_999".to_string(),
            razorpay_signature: signature.clone(),
        };
        assert!(!verifier.verify(&swapped).unwrap());

        let other_secret = SignatureVerifier::new(Secret::new("other".to_string()));
        let original = PaymentVerification {
            razorpay_order_id: "order_123".to_string(),
            razorpay_payment_id: "pay_456".to_string(),
            razorpay_signature: signature,
        };
        assert!(!other_secret.verify(&original).unwrap());
    }
}
