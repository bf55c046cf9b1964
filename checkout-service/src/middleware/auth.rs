use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::{services::MarketplaceClaims, startup::AppState};

/// Require a marketplace bearer token.
///
/// The header is split on whitespace and the second part is taken as the
/// token, so the scheme word itself is not checked.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<AuthErrorResponse>)> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Err(unauthorized("No token provided", "Please login to continue"));
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|value| value.split_whitespace().nth(1))
        .ok_or_else(|| unauthorized("Invalid token format", "Please login again"))?;

    let claims = state.jwt.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        unauthorized("Authentication failed", "Please login again")
    })?;

    tracing::Span::current().record("user_id", claims.user_id.as_str());

    // Store claims in request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

fn unauthorized(error: &str, message: &str) -> (StatusCode, Json<AuthErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub message: String,
}

/// Claims of the authenticated buyer.
pub struct AuthUser(pub MarketplaceClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<AuthErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<MarketplaceClaims>().ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AuthErrorResponse {
                    error: "Auth claims missing from request extensions".to_string(),
                    message: "Please login again".to_string(),
                }),
            )
        })?;

        Ok(AuthUser(claims.clone()))
    }
}
