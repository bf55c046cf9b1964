use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::services::{CheckoutError, OrderRequest, PaymentVerification, RazorpayOrder};
use crate::utils::parse_amount;

/// `POST /checkout` body. Both fields are optional at the wire level so a
/// missing one is reported as a domain error rather than a JSON rejection.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Smallest currency unit; number or numeric string.
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(rename = "productId", default)]
    pub product_id: Option<String>,
}

impl CheckoutRequest {
    pub fn into_order_request(self) -> Result<OrderRequest, CheckoutError> {
        let required =
            || CheckoutError::InvalidRequest("Amount and productId are required".to_string());

        let amount = self.amount.filter(|v| !v.is_null()).ok_or_else(required)?;
        let product_id = self
            .product_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(required)?;

        Ok(OrderRequest {
            amount_minor: parse_amount(&amount)?,
            product_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order: RazorpayOrder,
}

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub key: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "razorpay_order_id is required"))]
    pub razorpay_order_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "razorpay_payment_id is required"))]
    pub razorpay_payment_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "razorpay_signature is required"))]
    pub razorpay_signature: String,
}

impl From<VerifyPaymentRequest> for PaymentVerification {
    fn from(req: VerifyPaymentRequest) -> Self {
        Self {
            razorpay_order_id: req.razorpay_order_id,
            razorpay_payment_id: req.razorpay_payment_id,
            razorpay_signature: req.razorpay_signature,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
}
