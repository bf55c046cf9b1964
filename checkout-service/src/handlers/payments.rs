//! Checkout endpoints consumed by the marketplace frontend.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{CheckoutRequest, CheckoutResponse, KeyResponse, VerifyPaymentRequest, VerifyPaymentResponse},
    middleware::AuthUser,
    services::{CheckoutError, PaymentVerification},
    startup::AppState,
};

/// Create a gateway order for the authenticated buyer.
#[tracing::instrument(skip(state, user, payload), fields(buyer = %user.0.user_email))]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let Json(body) = payload?;
    let request = body.into_order_request()?;
    let order = state
        .checkout
        .initiate_order(request, &user.0.user_email)
        .await?;

    Ok(Json(CheckoutResponse {
        success: true,
        order,
    }))
}

/// Publishable gateway key for the payment sheet.
pub async fn get_key(State(state): State<AppState>, _user: AuthUser) -> Json<KeyResponse> {
    Json(KeyResponse {
        key: state.checkout.key_id().to_string(),
    })
}

/// Settle a payment from the signature returned by the payment sheet.
#[tracing::instrument(skip_all, fields(order_id = tracing::field::Empty))]
pub async fn verify_payment(
    State(state): State<AppState>,
    _user: AuthUser,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let Json(body) = payload?;
    tracing::Span::current().record("order_id", body.razorpay_order_id.as_str());

    body.validate().map_err(|e| {
        tracing::debug!(error = %e, "Incomplete verification payload");
        CheckoutError::InvalidRequest(
            "razorpay_order_id, razorpay_payment_id and razorpay_signature are required"
                .to_string(),
        )
    })?;

    let verification = PaymentVerification::from(body);
    state.checkout.verify_payment(&verification).await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        message: "Payment verified successfully".to_string(),
    }))
}
