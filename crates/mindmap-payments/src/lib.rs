//! # mindmap-payments
//!
//! Subscription billing, webhook processing and access rules for the mind map
//! service.
//!
//! ## Subscribing
//!
//! Two ways into a paid subscription, both ending in the same webhook stream:
//!
//! ### 1. Direct (API)
//!
//! The server creates the customer and subscription itself through a
//! [`BillingProvider`]. The provider trial is the remaining local trial.
//!
//! ### 2. Stripe Checkout (Hosted)
//!
//! **Flow:** Your site → Redirect to Stripe's hosted page → Redirect back
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │  Your Site  │────▶│  Stripe Hosted  │────▶│  Your Site  │
//! │  (pricing)  │     │  Checkout Page  │     │ (dashboard) │
//! └─────────────┘     └─────────────────┘     └─────────────┘
//!                              │
//!                              ▼ checkout.session.completed
//!                     ┌─────────────────┐
//!                     │ /webhook/stripe │
//!                     └─────────────────┘
//! ```
//!
//! The session carries the local user id and the new subscription id, so the
//! webhook can link the customer and create or adopt the subscription in
//! whichever order the provider delivers the events.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mindmap_payments::{WebhookHandler, MemorySubscriptionStore};
//!
//! let handler = WebhookHandler::new(Arc::new(MemorySubscriptionStore::new()), "whsec_xxx");
//! let outcome = handler.process(&body, signature_header).await?;
//! ```

pub mod access;
pub mod billing;
mod error;
pub mod store;
pub mod subscription;
pub mod webhook;

pub use access::{AccessStatus, TRIAL_DAYS, has_access, remaining_trial_days, trial_end};
pub use billing::{BillingProvider, CancelMode, CheckoutRequest, CheckoutSession, MockBillingProvider, StripeBilling};
pub use error::{PaymentError, Result};
pub use store::{
    CustomerLink, EventEffect, MemorySubscriptionStore, ProcessedEvent, Resolution, SubscriptionStore,
    WebhookOutcome, resolve_effect,
};
pub use subscription::{
    PaymentOutcome, PaymentRecord, SubscriptionChange, SubscriptionRecord, SubscriptionSnapshot, SubscriptionStatus,
};
pub use webhook::{EventKind, WebhookEvent, WebhookHandler, sign_payload, verify_signature};
