//! Payment-order lifecycle: order initiation and signature verification.
//!
//! Handlers stay thin; every rule about when a [`PaymentRecord`] is written
//! or moved lives here.

use std::sync::Arc;

use chrono::Utc;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::{PaymentRecord, PaymentStatus};
use crate::services::catalog::ProductCatalog;
use crate::services::metrics;
use crate::services::razorpay::{PaymentVerification, RazorpayClient, RazorpayOrder, SignatureVerifier};
use crate::services::repository::{PaymentStore, UpdateOutcome};

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Product not found")]
    ProductNotFound,

    #[error("Payment gateway error: {0}")]
    Gateway(anyhow::Error),

    #[error("Payment verification failed")]
    VerificationMismatch,

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            CheckoutError::ProductNotFound => {
                AppError::NotFound(anyhow::anyhow!("Product not found"))
            }
            CheckoutError::Gateway(e) => AppError::BadGateway(e.to_string()),
            CheckoutError::VerificationMismatch => {
                AppError::BadRequest(anyhow::anyhow!("Payment verification failed"))
            }
            CheckoutError::Storage(e) => AppError::DatabaseError(e),
            CheckoutError::Internal(e) => AppError::InternalError(e),
        }
    }
}

/// A validated checkout: amount in the smallest currency unit.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub amount_minor: u64,
    pub product_id: String,
}

#[derive(Clone)]
pub struct CheckoutService {
    gateway: RazorpayClient,
    verifier: SignatureVerifier,
    store: Arc<dyn PaymentStore>,
    catalog: Option<Arc<dyn ProductCatalog>>,
    currency: String,
}

impl CheckoutService {
    /// `catalog` is optional; without it product references are taken as given.
    pub fn new(
        gateway: RazorpayClient,
        verifier: SignatureVerifier,
        store: Arc<dyn PaymentStore>,
        catalog: Option<Arc<dyn ProductCatalog>>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            verifier,
            store,
            catalog,
            currency: currency.into(),
        }
    }

    pub fn key_id(&self) -> &str {
        self.gateway.key_id()
    }

    /// Mint a gateway order and record it as `pending`.
    ///
    /// Nothing is written unless the gateway accepted the order.
    pub async fn initiate_order(
        &self,
        request: OrderRequest,
        buyer: &str,
    ) -> Result<RazorpayOrder, CheckoutError> {
        let amount_minor = i64::try_from(request.amount_minor)
            .ok()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| CheckoutError::InvalidRequest("Invalid amount".to_string()))?;
        if request.product_id.trim().is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "Amount and productId are required".to_string(),
            ));
        }

        if let Some(catalog) = &self.catalog {
            let exists = catalog
                .product_exists(&request.product_id)
                .await
                .map_err(CheckoutError::Storage)?;
            if !exists {
                tracing::info!(product_id = %request.product_id, "Checkout for unknown product");
                metrics::record_order("product_not_found");
                return Err(CheckoutError::ProductNotFound);
            }
        }

        let receipt = format!("receipt_{}", Utc::now().timestamp_millis());
        let notes = serde_json::json!({ "productId": request.product_id });

        let order = self
            .gateway
            .create_order(
                request.amount_minor,
                &self.currency,
                Some(receipt.clone()),
                Some(notes),
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create gateway order");
                metrics::record_order("gateway_error");
                CheckoutError::Gateway(e)
            })?;

        let record = PaymentRecord::pending(
            order.id.clone(),
            request.product_id.clone(),
            buyer,
            amount_minor,
            self.currency.clone(),
            Some(receipt),
        );

        self.store.insert(record).await.map_err(|e| {
            tracing::error!(order_id = %order.id, error = %e, "Failed to save payment record");
            metrics::record_order("storage_error");
            CheckoutError::Storage(e)
        })?;

        tracing::info!(
            order_id = %order.id,
            product_id = %request.product_id,
            amount_minor = request.amount_minor,
            "Payment record created"
        );
        metrics::record_order("created");
        metrics::record_amount(&self.currency, request.amount_minor);

        Ok(order)
    }

    /// Check the gateway's signature and settle the record.
    ///
    /// Returns `Completed` for an authentic payload. A mismatch marks the
    /// record `failed` and returns [`CheckoutError::VerificationMismatch`].
    /// A missing record is logged and otherwise ignored.
    pub async fn verify_payment(
        &self,
        verification: &PaymentVerification,
    ) -> Result<PaymentStatus, CheckoutError> {
        let order_id = verification.razorpay_order_id.as_str();

        let is_valid = self.verifier.verify(verification).map_err(|e| {
            tracing::error!(error = %e, "Signature verification error");
            CheckoutError::Internal(e)
        })?;

        if is_valid {
            let outcome = self
                .store
                .mark_completed(
                    order_id,
                    &verification.razorpay_payment_id,
                    &verification.razorpay_signature,
                )
                .await
                .map_err(CheckoutError::Storage)?;

            log_outcome(order_id, PaymentStatus::Completed, outcome);
            metrics::record_verification("completed");
            Ok(PaymentStatus::Completed)
        } else {
            let outcome = self
                .store
                .mark_failed(order_id)
                .await
                .map_err(CheckoutError::Storage)?;

            log_outcome(order_id, PaymentStatus::Failed, outcome);
            metrics::record_verification("failed");
            Err(CheckoutError::VerificationMismatch)
        }
    }
}

fn log_outcome(order_id: &str, requested: PaymentStatus, outcome: UpdateOutcome) {
    match outcome {
        UpdateOutcome::Updated => {
            tracing::info!(order_id = %order_id, status = %requested, "Payment record updated");
        }
        UpdateOutcome::Unchanged(current) => {
            tracing::warn!(
                order_id = %order_id,
                current = %current,
                requested = %requested,
                "Payment record left unchanged"
            );
        }
        UpdateOutcome::Missing => {
            tracing::warn!(
                order_id = %order_id,
                requested = %requested,
                "RecordNotFound: no payment record for order"
            );
        }
    }
}
