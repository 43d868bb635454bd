//! Subscription Storage
//!
//! Storage abstraction for subscription rows, payments and processed webhook
//! events. `apply_event` must be atomic: the event id, the subscription change
//! and the payment row commit together or not at all.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::subscription::{
    PaymentRecord, SubscriptionChange, SubscriptionRecord, SubscriptionStatus, Transition, apply_change,
};

/// What processing a webhook event did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied,
    /// Event id was processed before; nothing changed
    Duplicate,
    /// Subscription is not known locally; logged and ignored
    UnknownSubscription,
    /// Older than the last event applied to the subscription
    Stale,
    /// Nothing to do for this event
    Ignored,
}

impl WebhookOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Duplicate => "duplicate",
            Self::UnknownSubscription => "unknown_subscription",
            Self::Stale => "stale",
            Self::Ignored => "ignored",
        }
    }
}

/// Provider event identity, stored for duplicate detection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
}

/// Checkout finished: the provider customer belongs to this local user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerLink {
    pub user_id: String,
    pub customer_id: String,

    /// Subscription the checkout created, when it created one
    pub subscription_id: Option<String>,

    /// Status to start that subscription in if no row exists yet
    pub status: SubscriptionStatus,
}

impl CustomerLink {
    /// Row for a subscription first seen through its checkout.
    ///
    /// `last_event_at` stays empty so any later lifecycle event applies.
    pub fn initial_record(&self, now: DateTime<Utc>) -> Option<SubscriptionRecord> {
        let subscription_id = self.subscription_id.clone()?;
        Some(SubscriptionRecord {
            user_id: self.user_id.clone(),
            customer_id: self.customer_id.clone(),
            subscription_id,
            price_id: None,
            status: self.status,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            last_event_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Everything one webhook event asks the store to do
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventEffect {
    pub change: Option<SubscriptionChange>,
    pub payment: Option<PaymentRecord>,
    pub link: Option<CustomerLink>,
}

impl EventEffect {
    pub const fn is_empty(&self) -> bool {
        self.change.is_none() && self.payment.is_none() && self.link.is_none()
    }

    /// Customer id the effect refers to, used to find the owning user
    pub fn customer_id(&self) -> Option<&str> {
        self.link
            .as_ref()
            .map(|l| l.customer_id.as_str())
            .or_else(|| self.change.as_ref().and_then(|c| c.customer_id.as_deref()))
            .or_else(|| self.payment.as_ref().and_then(|p| p.customer_id.as_deref()))
    }

    /// Subscription id the effect refers to
    pub fn subscription_id(&self) -> Option<&str> {
        self.change
            .as_ref()
            .map(|c| c.subscription_id.as_str())
            .or_else(|| self.payment.as_ref().and_then(|p| p.subscription_id.as_deref()))
            .or_else(|| self.link.as_ref().and_then(|l| l.subscription_id.as_deref()))
    }
}

/// Writes a store must perform for one event, decided from current state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: WebhookOutcome,
    pub upsert: Option<SubscriptionRecord>,
    pub payment: Option<PaymentRecord>,
    pub link: Option<CustomerLink>,
}

/// Decide what an event does given the stored subscription (if any) and the
/// local owner of the event's customer (if any)
pub fn resolve_effect(
    effect: &EventEffect,
    existing: Option<&SubscriptionRecord>,
    customer_owner: Option<&str>,
    now: DateTime<Utc>,
) -> Resolution {
    let mut outcome = WebhookOutcome::Ignored;
    let mut upsert = None;

    if let Some(change) = &effect.change {
        match existing {
            Some(current) => match apply_change(current, change, now) {
                Transition::Applied(next) => {
                    outcome = WebhookOutcome::Applied;
                    upsert = Some(next);
                }
                Transition::Stale => outcome = WebhookOutcome::Stale,
                Transition::Unchanged => outcome = WebhookOutcome::Ignored,
            },
            None => {
                match customer_owner.and_then(|user| SubscriptionRecord::from_change(user, change, now)) {
                    Some(record) => {
                        outcome = WebhookOutcome::Applied;
                        upsert = Some(record);
                    }
                    None => outcome = WebhookOutcome::UnknownSubscription,
                }
            }
        }
    }

    let payment = effect.payment.clone().map(|mut payment| {
        if payment.user_id.is_none() {
            payment.user_id = existing
                .map(|s| s.user_id.clone())
                .or_else(|| customer_owner.map(str::to_string));
        }
        payment
    });
    if payment.is_some() && effect.change.is_none() {
        outcome = WebhookOutcome::Applied;
    }

    let link = effect.link.clone();
    if let Some(link) = &link {
        outcome = WebhookOutcome::Applied;
        // lifecycle events that arrived before the checkout had no owner to attach to
        if existing.is_none() && upsert.is_none() {
            upsert = link.initial_record(now);
        }
    }

    Resolution {
        outcome,
        upsert,
        payment,
        link,
    }
}

/// Subscription storage trait
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or replace a subscription row
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<()>;

    async fn get(&self, subscription_id: &str) -> Result<Option<SubscriptionRecord>>;

    /// Most recently created subscription for a user
    async fn find_by_user(&self, user_id: &str) -> Result<Option<SubscriptionRecord>>;

    /// Remember which local user owns a provider customer
    async fn link_customer(&self, user_id: &str, customer_id: &str) -> Result<()>;

    /// Apply a verified webhook event exactly once
    async fn apply_event(&self, event: &ProcessedEvent, effect: &EventEffect) -> Result<WebhookOutcome>;

    async fn payments_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>>;
}

#[derive(Default)]
struct MemoryState {
    subscriptions: HashMap<String, SubscriptionRecord>,
    customers: HashMap<String, String>,
    payments: Vec<PaymentRecord>,
    events: HashSet<String>,
}

/// In-memory subscription store (for development/testing)
#[derive(Default)]
pub struct MemorySubscriptionStore {
    state: Mutex<MemoryState>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn processed_event_count(&self) -> usize {
        self.state.lock().await.events.len()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut next = record.clone();
        if let Some(current) = state.subscriptions.get(&record.subscription_id) {
            if current.status.is_terminal() {
                return Ok(());
            }
            next.created_at = current.created_at;
            next.last_event_at = current.last_event_at.max(record.last_event_at);
        }
        state
            .customers
            .entry(next.customer_id.clone())
            .or_insert_with(|| next.user_id.clone());
        state.subscriptions.insert(next.subscription_id.clone(), next);
        Ok(())
    }

    async fn get(&self, subscription_id: &str) -> Result<Option<SubscriptionRecord>> {
        Ok(self.state.lock().await.subscriptions.get(subscription_id).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<SubscriptionRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn link_customer(&self, user_id: &str, customer_id: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .customers
            .insert(customer_id.to_string(), user_id.to_string());
        Ok(())
    }

    async fn apply_event(&self, event: &ProcessedEvent, effect: &EventEffect) -> Result<WebhookOutcome> {
        // one lock for the whole event keeps it atomic
        let mut state = self.state.lock().await;
        if !state.events.insert(event.event_id.clone()) {
            return Ok(WebhookOutcome::Duplicate);
        }

        let existing = effect
            .subscription_id()
            .and_then(|id| state.subscriptions.get(id))
            .cloned();
        let owner = effect
            .customer_id()
            .and_then(|id| state.customers.get(id))
            .cloned();

        let resolution = resolve_effect(effect, existing.as_ref(), owner.as_deref(), Utc::now());

        // a customer already owned by another user keeps its owner
        if let Some(link) = resolution.link {
            state.customers.entry(link.customer_id).or_insert(link.user_id);
        }
        if let Some(record) = resolution.upsert {
            state
                .customers
                .entry(record.customer_id.clone())
                .or_insert_with(|| record.user_id.clone());
            state.subscriptions.insert(record.subscription_id.clone(), record);
        }
        if let Some(payment) = resolution.payment {
            state.payments.push(payment);
        }

        Ok(resolution.outcome)
    }

    async fn payments_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let state = self.state.lock().await;
        let mut payments: Vec<_> = state
            .payments
            .iter()
            .filter(|p| p.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::{PaymentOutcome, SubscriptionStatus};

    fn record() -> SubscriptionRecord {
        let now = Utc::now();
        SubscriptionRecord {
            user_id: "user-1".into(),
            customer_id: "cus_1".into(),
            subscription_id: "sub_1".into(),
            price_id: Some("price_monthly".into()),
            status: SubscriptionStatus::Trialing,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            last_event_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn event(id: &str) -> ProcessedEvent {
        ProcessedEvent {
            event_id: id.into(),
            event_type: "customer.subscription.updated".into(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let store = MemorySubscriptionStore::new();
        store.upsert(&record()).await.unwrap();

        assert!(store.get("sub_1").await.unwrap().is_some());
        assert_eq!(
            store.find_by_user("user-1").await.unwrap().unwrap().subscription_id,
            "sub_1"
        );
        assert!(store.find_by_user("user-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_event_is_noop() {
        let store = MemorySubscriptionStore::new();
        store.upsert(&record()).await.unwrap();
        let effect = EventEffect {
            change: Some(SubscriptionChange::status("sub_1", SubscriptionStatus::Active, Utc::now())),
            ..EventEffect::default()
        };

        assert_eq!(store.apply_event(&event("evt_1"), &effect).await.unwrap(), WebhookOutcome::Applied);
        assert_eq!(store.apply_event(&event("evt_1"), &effect).await.unwrap(), WebhookOutcome::Duplicate);
        assert_eq!(store.processed_event_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_customer_creates_nothing() {
        let store = MemorySubscriptionStore::new();
        let effect = EventEffect {
            change: Some(SubscriptionChange::status("sub_x", SubscriptionStatus::Active, Utc::now())),
            ..EventEffect::default()
        };

        let outcome = store.apply_event(&event("evt_1"), &effect).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::UnknownSubscription);
        assert!(store.get("sub_x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_linked_customer_adopts_new_subscription() {
        let store = MemorySubscriptionStore::new();
        store.link_customer("user-9", "cus_9").await.unwrap();
        let mut change = SubscriptionChange::status("sub_9", SubscriptionStatus::Trialing, Utc::now());
        change.customer_id = Some("cus_9".into());
        let effect = EventEffect {
            change: Some(change),
            ..EventEffect::default()
        };

        assert_eq!(store.apply_event(&event("evt_9"), &effect).await.unwrap(), WebhookOutcome::Applied);
        let stored = store.get("sub_9").await.unwrap().unwrap();
        assert_eq!(stored.user_id, "user-9");
        assert_eq!(stored.status, SubscriptionStatus::Trialing);
    }

    #[tokio::test]
    async fn test_payment_is_attributed_to_subscription_owner() {
        let store = MemorySubscriptionStore::new();
        store.upsert(&record()).await.unwrap();
        let effect = EventEffect {
            payment: Some(PaymentRecord {
                id: "pay_1".into(),
                user_id: None,
                subscription_id: Some("sub_1".into()),
                customer_id: None,
                provider_reference: "in_1".into(),
                amount_minor: 999,
                currency: "usd".into(),
                outcome: PaymentOutcome::Succeeded,
                event_id: "evt_2".into(),
                created_at: Utc::now(),
            }),
            ..EventEffect::default()
        };

        store.apply_event(&event("evt_2"), &effect).await.unwrap();
        let payments = store.payments_for_user("user-1").await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_minor, 999);
    }

    #[tokio::test]
    async fn test_checkout_after_lifecycle_event_creates_row() {
        let store = MemorySubscriptionStore::new();
        let early = Utc::now();
        let mut change = SubscriptionChange::status("sub_7", SubscriptionStatus::Active, early);
        change.customer_id = Some("cus_7".into());
        let update = EventEffect {
            change: Some(change),
            ..EventEffect::default()
        };
        assert_eq!(
            store.apply_event(&event("evt_1"), &update).await.unwrap(),
            WebhookOutcome::UnknownSubscription
        );

        let checkout = EventEffect {
            link: Some(CustomerLink {
                user_id: "user-7".into(),
                customer_id: "cus_7".into(),
                subscription_id: Some("sub_7".into()),
                status: SubscriptionStatus::Trialing,
            }),
            ..EventEffect::default()
        };
        assert_eq!(store.apply_event(&event("evt_2"), &checkout).await.unwrap(), WebhookOutcome::Applied);
        let stored = store.find_by_user("user-7").await.unwrap().unwrap();
        assert_eq!(stored.subscription_id, "sub_7");
        assert_eq!(stored.status, SubscriptionStatus::Trialing);

        // later lifecycle events keep applying to the new row
        let mut change = SubscriptionChange::status("sub_7", SubscriptionStatus::PastDue, early);
        change.customer_id = Some("cus_7".into());
        let later = EventEffect {
            change: Some(change),
            ..EventEffect::default()
        };
        assert_eq!(store.apply_event(&event("evt_3"), &later).await.unwrap(), WebhookOutcome::Applied);
        assert_eq!(store.get("sub_7").await.unwrap().unwrap().status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn test_upsert_does_not_revive_canceled_row() {
        let store = MemorySubscriptionStore::new();
        store.upsert(&record()).await.unwrap();
        let deleted_at = Utc::now();
        let effect = EventEffect {
            change: Some(SubscriptionChange::deletion("sub_1", deleted_at)),
            ..EventEffect::default()
        };
        store.apply_event(&event("evt_del"), &effect).await.unwrap();

        // a write-back built from a read taken before the deletion
        let mut stale = record();
        stale.status = SubscriptionStatus::Active;
        store.upsert(&stale).await.unwrap();

        let stored = store.get("sub_1").await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Canceled);
        assert_eq!(stored.last_event_at, Some(deleted_at));
    }

    #[tokio::test]
    async fn test_upsert_keeps_latest_event_time() {
        let store = MemorySubscriptionStore::new();
        let latest = Utc::now();
        let mut first = record();
        first.last_event_at = Some(latest);
        store.upsert(&first).await.unwrap();

        let mut older = record();
        older.last_event_at = Some(latest - chrono::Duration::minutes(5));
        store.upsert(&older).await.unwrap();

        assert_eq!(store.get("sub_1").await.unwrap().unwrap().last_event_at, Some(latest));
    }

    #[tokio::test]
    async fn test_checkout_for_owned_customer_keeps_owner() {
        let store = MemorySubscriptionStore::new();
        store.upsert(&record()).await.unwrap();
        let effect = EventEffect {
            link: Some(CustomerLink {
                user_id: "user-2".into(),
                customer_id: "cus_1".into(),
                subscription_id: None,
                status: SubscriptionStatus::Active,
            }),
            ..EventEffect::default()
        };

        store.apply_event(&event("evt_link"), &effect).await.unwrap();
        assert_eq!(
            store.state.lock().await.customers.get("cus_1").map(String::as_str),
            Some("user-1")
        );
    }
}
