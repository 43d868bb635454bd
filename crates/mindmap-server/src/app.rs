//! Router and service wiring

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use mindmap_core::LlmProvider;
use mindmap_generator::{ChapterExtractor, DocumentPipeline, GenerationConfig, GenerationService};
use mindmap_payments::{BillingProvider, MockBillingProvider, StripeBilling, WebhookHandler};
use mindmap_runtime::{OllamaProvider, OpenAiProvider};
use mindmap_store::Database;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{Config, LlmBackend};
use crate::handlers::{
    cancel, create_checkout, create_mindmap, delete_mindmap, export_mindmap, generate_mindmap, get_mindmap,
    health_check, languages, list_mindmaps, login, logout, me, payments, reactivate, register, stripe_webhook,
    subscribe, subscription, update_mindmap, upload_document,
};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Price used with the mock billing provider
const MOCK_PRICE_ID: &str = "price_mock_monthly";

pub fn router(state: AppState, static_dir: &str) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/languages", get(languages))

        // Accounts
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/me", get(me))

        // Mind maps
        .route("/api/mindmaps", get(list_mindmaps).post(create_mindmap))
        .route("/api/mindmaps/generate", post(generate_mindmap))
        .route(
            "/api/mindmaps/upload",
            post(upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/mindmaps/{id}",
            get(get_mindmap).put(update_mindmap).delete(delete_mindmap),
        )
        .route("/api/mindmaps/{id}/export/{format}", get(export_mindmap))

        // Billing
        .route("/api/billing/subscribe", post(subscribe))
        .route("/api/billing/cancel", post(cancel))
        .route("/api/billing/reactivate", post(reactivate))
        .route("/api/billing/subscription", get(subscription))
        .route("/api/billing/payments", get(payments))
        .route("/api/checkout", post(create_checkout))
        .route("/webhook/stripe", post(stripe_webhook))

        // Static files (WASM frontend)
        .fallback_service(ServeDir::new(static_dir))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn llm_provider(backend: LlmBackend) -> anyhow::Result<(Arc<dyn LlmProvider>, String)> {
    Ok(match backend {
        LlmBackend::OpenAi => {
            let provider = OpenAiProvider::from_env()?;
            let model = provider.default_model().to_string();
            (Arc::new(provider), model)
        }
        LlmBackend::Ollama => {
            let provider = OllamaProvider::from_env();
            let model = provider.default_model().to_string();
            (Arc::new(provider), model)
        }
    })
}

/// Construct every service once from `config`
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let db = Database::connect(&config.database_url).await?;

    let (provider, model) = llm_provider(config.llm)?;
    match provider.health_check().await {
        Ok(true) => tracing::info!(%model, "✓ Model provider reachable"),
        Ok(false) | Err(_) => tracing::warn!(%model, "⚠ Model provider not reachable - generation will fail"),
    }

    let mut generation = GenerationConfig::default();
    generation.options.model = model;
    let generator = Arc::new(GenerationService::new(provider, generation));
    let pipeline = Arc::new(DocumentPipeline::new(ChapterExtractor::default(), generator.clone()));

    let (billing, price_id): (Arc<dyn BillingProvider>, Option<String>) = match &config.billing.secret_key {
        Some(key) => {
            tracing::info!("✓ Stripe configured");
            (Arc::new(StripeBilling::new(key)), config.billing.price_id.clone())
        }
        None => {
            tracing::warn!("⚠ Stripe not configured - using mock billing");
            tracing::warn!("  Set STRIPE_SECRET_KEY, STRIPE_WEBHOOK_SECRET and STRIPE_MONTHLY_PRICE_ID in .env");
            (
                Arc::new(MockBillingProvider::new()),
                Some(config.billing.price_id.clone().unwrap_or_else(|| MOCK_PRICE_ID.into())),
            )
        }
    };

    let webhooks = config
        .billing
        .webhook_secret
        .as_ref()
        .map(|secret| Arc::new(WebhookHandler::new(Arc::new(db.clone()), secret.clone())));
    if webhooks.is_none() {
        tracing::warn!("⚠ STRIPE_WEBHOOK_SECRET not set - webhook endpoint disabled");
    }

    Ok(AppState {
        db,
        generator,
        pipeline,
        billing,
        price_id,
        webhooks,
    })
}
