//! HTTP Handlers

mod account;
mod billing;
mod mindmaps;
mod webhook;

use axum::{Json, extract::State};
use chrono::Utc;
use mindmap_generator::Language;
use mindmap_payments::{AccessStatus, SubscriptionStore};
use mindmap_store::User;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub use account::{login, logout, me, register};
pub use billing::{cancel, create_checkout, payments, reactivate, subscribe, subscription};
pub use mindmaps::{
    create_mindmap, delete_mindmap, export_mindmap, generate_mindmap, get_mindmap, list_mindmaps, update_mindmap,
    upload_document,
};
pub use webhook::stripe_webhook;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model_connected: bool,
    pub billing_provider: &'static str,
    pub billing_configured: bool,
    pub database: bool,
}

#[derive(Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_connected = state.generator.provider().health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model_connected,
        billing_provider: state.billing.name(),
        billing_configured: state.webhooks.is_some() && state.price_id.is_some(),
        database: state.db.ping().await,
    })
}

pub async fn languages() -> Json<Vec<LanguageInfo>> {
    Json(
        Language::ALL
            .iter()
            .map(|lang| LanguageInfo {
                code: lang.code(),
                name: lang.display_name(),
            })
            .collect(),
    )
}

/// Trial and subscription summary for `user`
pub(crate) async fn access_status(state: &AppState, user: &User) -> ApiResult<AccessStatus> {
    let subscription = state.db.find_by_user(&user.id).await?;
    Ok(AccessStatus::evaluate(Utc::now(), user.trial_ends_at, subscription.as_ref()))
}

/// Fail with 402 unless `user` is in trial or actively subscribed
pub(crate) async fn require_access(state: &AppState, user: &User) -> ApiResult<()> {
    let access = access_status(state, user).await?;
    if access.has_access {
        Ok(())
    } else {
        tracing::info!(user_id = %user.id, "Generation blocked: trial over and no active subscription");
        Err(ApiError::PaymentRequired)
    }
}
