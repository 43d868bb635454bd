//! Mind map HTTP server
//!
//! Axum-based server providing the JSON API, the Stripe webhook endpoint and
//! the static web UI.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mindmap_server::{Config, build_state, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.production {
        tracing::info!("Running in production mode");
    }

    let state = build_state(&config).await?;
    let app = router(state, &config.static_dir);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 mindmap server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                     - Health check");
    tracing::info!("  POST /api/auth/register          - Create account (14-day trial)");
    tracing::info!("  POST /api/mindmaps/generate      - Generate from text or topic");
    tracing::info!("  POST /api/mindmaps/upload        - Generate from a PDF");
    tracing::info!("  GET  /api/mindmaps/{{id}}/export/{{format}} - Download md/html/canvas");
    tracing::info!("  POST /api/billing/subscribe      - Start subscription");
    tracing::info!("  POST /webhook/stripe             - Stripe events");

    axum::serve(listener, app).await?;

    Ok(())
}
