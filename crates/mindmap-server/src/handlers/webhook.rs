//! Stripe webhook endpoint

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use mindmap_payments::WebhookOutcome;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub outcome: WebhookOutcome,
}

/// Stripe webhook handler. Duplicates and unknown subscriptions still answer 200.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let handler = state.webhooks.as_ref().ok_or(ApiError::BillingDisabled)?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Validation("Missing Stripe signature".into()))?;

    let outcome = handler.process(&body, signature).await?;
    Ok(Json(WebhookResponse {
        received: true,
        outcome,
    }))
}
