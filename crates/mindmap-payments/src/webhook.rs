//! Stripe Webhook Handling
//!
//! Verifies the `Stripe-Signature` header, parses the payload into a closed set
//! of events, and hands the resulting state change to the subscription store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::{PaymentError, Result};
use crate::store::{CustomerLink, EventEffect, ProcessedEvent, SubscriptionStore, WebhookOutcome};
use crate::subscription::{PaymentOutcome, PaymentRecord, SubscriptionChange, SubscriptionStatus};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Check a `t=<unix>,v1=<hex>` signature header against `payload`
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now: i64, tolerance_secs: i64) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| PaymentError::WebhookSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(PaymentError::WebhookSignature("missing v1 signature".into()));
    }
    // clock skew cuts both ways
    if (now - timestamp).abs() > tolerance_secs {
        return Err(PaymentError::WebhookSignature("timestamp outside tolerance".into()));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::WebhookSignature(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures
        .iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());

    if matched {
        Ok(())
    } else {
        Err(PaymentError::WebhookSignature("no matching signature".into()))
    }
}

/// Build a signature header the way the provider does
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
}

/// Subscription fields carried by `customer.subscription.*` events
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionEvent {
    pub subscription_id: String,
    pub customer_id: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub price_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Payment fields carried by invoice and payment intent events
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentEvent {
    pub reference: String,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutEvent {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Local user id from `client_reference_id` or metadata
    pub user_id: Option<String>,
    pub payment_status: Option<String>,
}

impl CheckoutEvent {
    /// Status a subscription created by this checkout starts in
    pub fn initial_status(&self) -> SubscriptionStatus {
        match self.payment_status.as_deref() {
            Some("no_payment_required") => SubscriptionStatus::Trialing,
            Some("unpaid") => SubscriptionStatus::PastDue,
            _ => SubscriptionStatus::Active,
        }
    }
}

/// Events this service understands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    SubscriptionCreated(SubscriptionEvent),
    SubscriptionUpdated(SubscriptionEvent),
    SubscriptionDeleted(SubscriptionEvent),
    InvoicePaymentSucceeded(PaymentEvent),
    InvoicePaymentFailed(PaymentEvent),
    PaymentIntentSucceeded(PaymentEvent),
    PaymentIntentFailed(PaymentEvent),
    CheckoutCompleted(CheckoutEvent),
    Unhandled { event_type: String },
}

/// Verified, parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    pub created: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    object: Value,
}

#[derive(Deserialize)]
struct RawSubscription {
    id: String,
    #[serde(default)]
    customer: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    current_period_start: Option<i64>,
    #[serde(default)]
    current_period_end: Option<i64>,
    #[serde(default)]
    cancel_at_period_end: bool,
    #[serde(default)]
    items: Option<Value>,
}

#[derive(Deserialize)]
struct RawInvoice {
    id: String,
    #[serde(default)]
    customer: Option<Value>,
    #[serde(default)]
    subscription: Option<Value>,
    #[serde(default)]
    parent: Option<Value>,
    #[serde(default)]
    amount_paid: i64,
    #[serde(default)]
    amount_due: i64,
    #[serde(default)]
    currency: String,
}

#[derive(Deserialize)]
struct RawPaymentIntent {
    id: String,
    #[serde(default)]
    customer: Option<Value>,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    currency: String,
}

#[derive(Deserialize)]
struct RawCheckoutSession {
    id: String,
    #[serde(default)]
    customer: Option<Value>,
    #[serde(default)]
    subscription: Option<Value>,
    #[serde(default)]
    client_reference_id: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Ids arrive either as a string or as an expanded object with an `id` field
fn object_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn object<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| PaymentError::WebhookParse(e.to_string()))
}

impl SubscriptionEvent {
    fn from_raw(raw: RawSubscription) -> Self {
        let first_item = raw
            .items
            .as_ref()
            .and_then(|items| items.get("data"))
            .and_then(|data| data.get(0));
        let price_id = first_item
            .and_then(|item| item.get("price"))
            .and_then(|price| object_id(Some(price)));
        // newer API versions carry the period on the item
        let period = |field: &str| {
            first_item
                .and_then(|item| item.get(field))
                .and_then(Value::as_i64)
        };

        Self {
            subscription_id: raw.id,
            customer_id: object_id(raw.customer.as_ref()),
            status: raw.status.as_deref().and_then(SubscriptionStatus::from_provider),
            price_id,
            current_period_start: raw
                .current_period_start
                .or_else(|| period("current_period_start"))
                .and_then(timestamp),
            current_period_end: raw
                .current_period_end
                .or_else(|| period("current_period_end"))
                .and_then(timestamp),
            cancel_at_period_end: raw.cancel_at_period_end,
        }
    }

    fn into_change(self, event_at: DateTime<Utc>, deleted: bool) -> SubscriptionChange {
        SubscriptionChange {
            subscription_id: self.subscription_id,
            customer_id: self.customer_id,
            status: self.status,
            price_id: self.price_id,
            current_period_start: self.current_period_start,
            current_period_end: self.current_period_end,
            cancel_at_period_end: Some(self.cancel_at_period_end),
            deleted,
            event_at,
        }
    }
}

impl PaymentEvent {
    fn from_invoice(raw: RawInvoice, succeeded: bool) -> Self {
        let subscription_id = object_id(raw.subscription.as_ref()).or_else(|| {
            raw.parent
                .as_ref()
                .and_then(|p| p.get("subscription_details"))
                .and_then(|d| object_id(d.get("subscription")))
        });
        Self {
            reference: raw.id,
            subscription_id,
            customer_id: object_id(raw.customer.as_ref()),
            amount_minor: if succeeded { raw.amount_paid } else { raw.amount_due },
            currency: raw.currency,
        }
    }

    fn from_intent(raw: RawPaymentIntent) -> Self {
        Self {
            reference: raw.id,
            subscription_id: None,
            customer_id: object_id(raw.customer.as_ref()),
            amount_minor: raw.amount,
            currency: raw.currency,
        }
    }

    fn into_record(self, event: &WebhookEvent, outcome: PaymentOutcome) -> PaymentRecord {
        PaymentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            subscription_id: self.subscription_id,
            customer_id: self.customer_id,
            provider_reference: self.reference,
            amount_minor: self.amount_minor,
            currency: self.currency,
            outcome,
            event_id: event.id.clone(),
            created_at: event.created,
        }
    }
}

impl WebhookEvent {
    /// Parse a raw (already verified) payload
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let raw: RawEvent =
            serde_json::from_slice(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;
        let created = timestamp(raw.created)
            .ok_or_else(|| PaymentError::WebhookParse(format!("bad timestamp {}", raw.created)))?;
        let obj = raw.data.object;

        let kind = match raw.event_type.as_str() {
            "customer.subscription.created" => {
                EventKind::SubscriptionCreated(SubscriptionEvent::from_raw(object(obj)?))
            }
            "customer.subscription.updated" => {
                EventKind::SubscriptionUpdated(SubscriptionEvent::from_raw(object(obj)?))
            }
            "customer.subscription.deleted" => {
                EventKind::SubscriptionDeleted(SubscriptionEvent::from_raw(object(obj)?))
            }
            "invoice.payment_succeeded" | "invoice.paid" => {
                EventKind::InvoicePaymentSucceeded(PaymentEvent::from_invoice(object(obj)?, true))
            }
            "invoice.payment_failed" => {
                EventKind::InvoicePaymentFailed(PaymentEvent::from_invoice(object(obj)?, false))
            }
            "payment_intent.succeeded" => {
                EventKind::PaymentIntentSucceeded(PaymentEvent::from_intent(object(obj)?))
            }
            "payment_intent.payment_failed" => {
                EventKind::PaymentIntentFailed(PaymentEvent::from_intent(object(obj)?))
            }
            "checkout.session.completed" => {
                let session: RawCheckoutSession = object(obj)?;
                EventKind::CheckoutCompleted(CheckoutEvent {
                    session_id: session.id,
                    customer_id: object_id(session.customer.as_ref()),
                    subscription_id: object_id(session.subscription.as_ref()),
                    user_id: session
                        .client_reference_id
                        .or_else(|| session.metadata.get("user_id").cloned()),
                    payment_status: session.payment_status,
                })
            }
            other => EventKind::Unhandled {
                event_type: other.to_string(),
            },
        };

        Ok(Self {
            id: raw.id,
            event_type: raw.event_type,
            created,
            kind,
        })
    }

    /// What this event asks the store to change
    pub fn effect(&self) -> EventEffect {
        let at = self.created;
        match self.kind.clone() {
            EventKind::SubscriptionCreated(sub) | EventKind::SubscriptionUpdated(sub) => EventEffect {
                change: Some(sub.into_change(at, false)),
                ..EventEffect::default()
            },
            EventKind::SubscriptionDeleted(sub) => EventEffect {
                change: Some(sub.into_change(at, true)),
                ..EventEffect::default()
            },
            EventKind::InvoicePaymentSucceeded(payment) => {
                self.payment_effect(payment, PaymentOutcome::Succeeded, Some(SubscriptionStatus::Active))
            }
            EventKind::InvoicePaymentFailed(payment) => {
                self.payment_effect(payment, PaymentOutcome::Failed, Some(SubscriptionStatus::PastDue))
            }
            EventKind::PaymentIntentSucceeded(payment) => {
                self.payment_effect(payment, PaymentOutcome::Succeeded, None)
            }
            EventKind::PaymentIntentFailed(payment) => {
                self.payment_effect(payment, PaymentOutcome::Failed, None)
            }
            EventKind::CheckoutCompleted(checkout) => {
                let status = checkout.initial_status();
                EventEffect {
                    link: checkout
                        .user_id
                        .zip(checkout.customer_id)
                        .map(|(user_id, customer_id)| CustomerLink {
                            user_id,
                            customer_id,
                            subscription_id: checkout.subscription_id,
                            status,
                        }),
                    ..EventEffect::default()
                }
            }
            EventKind::Unhandled { .. } => EventEffect::default(),
        }
    }

    fn payment_effect(
        &self,
        payment: PaymentEvent,
        outcome: PaymentOutcome,
        status: Option<SubscriptionStatus>,
    ) -> EventEffect {
        let change = status.zip(payment.subscription_id.clone()).map(|(status, id)| {
            let mut change = SubscriptionChange::status(id, status, self.created);
            change.customer_id.clone_from(&payment.customer_id);
            change
        });
        EventEffect {
            change,
            payment: Some(payment.into_record(self, outcome)),
            link: None,
        }
    }
}

/// Webhook handler
pub struct WebhookHandler<S: SubscriptionStore + ?Sized> {
    store: Arc<S>,
    secret: String,
    tolerance_secs: i64,
}

impl<S: SubscriptionStore + ?Sized> WebhookHandler<S> {
    pub fn new(store: Arc<S>, secret: impl Into<String>) -> Self {
        Self {
            store,
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent> {
        verify_signature(payload, signature, &self.secret, Utc::now().timestamp(), self.tolerance_secs)?;
        WebhookEvent::parse(payload)
    }

    /// Verify, parse and apply a raw webhook request
    pub async fn process(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome> {
        let event = match self.parse_event(payload, signature) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected Stripe webhook");
                return Err(e);
            }
        };
        self.handle(&event).await
    }

    /// Apply a verified event
    pub async fn handle(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "Processing Stripe webhook");

        let effect = event.effect();
        if matches!(event.kind, EventKind::CheckoutCompleted(_)) && effect.is_empty() {
            tracing::warn!(event_id = %event.id, "Checkout session has no user reference or customer");
        }

        let processed = ProcessedEvent {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            occurred_at: event.created,
        };
        let outcome = self.store.apply_event(&processed, &effect).await?;

        match outcome {
            WebhookOutcome::Applied => tracing::info!(
                event_id = %event.id,
                subscription_id = ?effect.subscription_id(),
                "Applied webhook event"
            ),
            WebhookOutcome::Duplicate => {
                tracing::debug!(event_id = %event.id, "Duplicate webhook event ignored");
            }
            WebhookOutcome::UnknownSubscription => tracing::warn!(
                event_id = %event.id,
                subscription_id = ?effect.subscription_id(),
                "Webhook for unknown subscription ignored"
            ),
            WebhookOutcome::Stale => tracing::info!(
                event_id = %event.id,
                subscription_id = ?effect.subscription_id(),
                "Out-of-order webhook event ignored"
            ),
            WebhookOutcome::Ignored => {
                tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Nothing to apply");
            }
        }

        Ok(outcome)
    }
}
