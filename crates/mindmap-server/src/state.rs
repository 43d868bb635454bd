//! Application State

use std::sync::Arc;

use mindmap_generator::{DocumentPipeline, GenerationService};
use mindmap_payments::{BillingProvider, WebhookHandler};
use mindmap_store::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,

    pub generator: Arc<GenerationService>,

    /// PDF → chapters → mind map
    pub pipeline: Arc<DocumentPipeline>,

    /// Stripe, or the in-memory mock in development
    pub billing: Arc<dyn BillingProvider>,

    /// Monthly plan price; subscribing is disabled without it
    pub price_id: Option<String>,

    /// None when no webhook secret is configured
    pub webhooks: Option<Arc<WebhookHandler<Database>>>,
}
