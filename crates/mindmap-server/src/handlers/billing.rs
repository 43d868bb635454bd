//! Subscription management and hosted checkout

use axum::{Json, extract::State};
use chrono::Utc;
use mindmap_payments::{
    CancelMode, CheckoutRequest as PaymentCheckoutRequest, PaymentRecord, SubscriptionRecord, SubscriptionStore,
    remaining_trial_days,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub mode: CancelMode,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

fn price_id(state: &AppState) -> ApiResult<&str> {
    state.price_id.as_deref().ok_or(ApiError::BillingDisabled)
}

async fn current_subscription(state: &AppState, user_id: &str) -> ApiResult<SubscriptionRecord> {
    state.db.find_by_user(user_id).await?.ok_or(ApiError::NotFound)
}

/// Write a provider-synced row back and return what the store kept.
///
/// A webhook may have canceled the row since it was read; the stored row wins.
async fn save(state: &AppState, record: SubscriptionRecord) -> ApiResult<SubscriptionRecord> {
    state.db.upsert(&record).await?;
    Ok(state.db.get(&record.subscription_id).await?.unwrap_or(record))
}

/// Create the provider customer on first use
async fn ensure_customer(state: &AppState, auth: &AuthUser) -> ApiResult<String> {
    if let Some(customer_id) = &auth.user.customer_id {
        return Ok(customer_id.clone());
    }
    let customer_id = state
        .billing
        .create_customer(&auth.user.email, &auth.user.username)
        .await?;
    state.db.set_customer_id(&auth.user.id, &customer_id).await?;
    Ok(customer_id)
}

pub async fn subscribe(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<SubscriptionRecord>> {
    let price_id = price_id(&state)?.to_string();
    let existing = state.db.find_by_user(&auth.user.id).await?;
    if existing.is_some_and(|s| !s.status.is_terminal()) {
        return Err(ApiError::Conflict("Already subscribed".into()));
    }

    let customer_id = ensure_customer(&state, &auth).await?;
    let now = Utc::now();
    // a provider trial never outlives the local one
    let trial_days = remaining_trial_days(now, auth.user.trial_ends_at);

    let snapshot = state
        .billing
        .create_subscription(&customer_id, &price_id, Some(trial_days))
        .await?;
    let record = save(&state, SubscriptionRecord::from_snapshot(&auth.user.id, &snapshot, now)).await?;

    tracing::info!(
        user_id = %auth.user.id,
        subscription_id = %record.subscription_id,
        status = %record.status,
        trial_days,
        "Subscription created"
    );
    Ok(Json(record))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CancelRequest>,
) -> ApiResult<Json<SubscriptionRecord>> {
    let mut record = current_subscription(&state, &auth.user.id).await?;
    if record.status.is_terminal() {
        return Err(ApiError::Conflict("Subscription is already canceled".into()));
    }

    let snapshot = state
        .billing
        .cancel_subscription(&record.subscription_id, request.mode)
        .await?;
    record.sync_from(&snapshot, Utc::now());
    let record = save(&state, record).await?;

    tracing::info!(user_id = %auth.user.id, subscription_id = %record.subscription_id, mode = ?request.mode, "Subscription canceled");
    Ok(Json(record))
}

pub async fn reactivate(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<SubscriptionRecord>> {
    let mut record = current_subscription(&state, &auth.user.id).await?;
    if record.status.is_terminal() {
        return Err(ApiError::Conflict("A canceled subscription cannot be reactivated".into()));
    }
    if !record.cancel_at_period_end {
        return Ok(Json(record));
    }

    let snapshot = state.billing.reactivate_subscription(&record.subscription_id).await?;
    record.sync_from(&snapshot, Utc::now());
    Ok(Json(save(&state, record).await?))
}

/// Refresh the local row from the provider
pub async fn subscription(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Option<SubscriptionRecord>>> {
    let Some(mut record) = state.db.find_by_user(&auth.user.id).await? else {
        return Ok(Json(None));
    };
    if record.status.is_terminal() {
        return Ok(Json(Some(record)));
    }

    match state.billing.get_subscription(&record.subscription_id).await {
        Ok(snapshot) => {
            record.sync_from(&snapshot, Utc::now());
            Ok(Json(Some(save(&state, record).await?)))
        }
        Err(e) => {
            // serve the stored row when the provider is unreachable
            tracing::warn!(error = %e, subscription_id = %record.subscription_id, "Subscription refresh failed");
            Ok(Json(Some(record)))
        }
    }
}

pub async fn payments(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<PaymentRecord>>> {
    Ok(Json(state.db.payments_for_user(&auth.user.id).await?))
}

/// Create a hosted checkout session
pub async fn create_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let price_id = price_id(&state)?.to_string();
    let request = PaymentCheckoutRequest {
        customer_email: Some(auth.user.email.clone()),
        customer_id: auth.user.customer_id.clone(),
        price_id,
        user_id: auth.user.id.clone(),
        trial_days: Some(remaining_trial_days(Utc::now(), auth.user.trial_ends_at)),
        success_url: payload.success_url,
        cancel_url: payload.cancel_url,
    };

    let session = state.billing.create_checkout_session(&request).await?;
    Ok(Json(CheckoutResponse {
        checkout_url: session.checkout_url,
        session_id: session.id,
    }))
}
