//! Subscription State
//!
//! Local view of a provider subscription, and the transition rule every
//! webhook-driven change goes through:
//!
//! ```text
//!  trialing ──▶ active ◀──▶ past_due
//!      │          │            │
//!      └──────────┴────────────┴──▶ canceled (terminal)
//! ```
//!
//! Events older than the last applied one are ignored, except deletion.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local subscription status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }

    /// Map a provider status string onto the local set
    pub fn from_provider(status: &str) -> Option<Self> {
        match status {
            "trialing" => Some(Self::Trialing),
            "active" => Some(Self::Active),
            "past_due" | "unpaid" | "incomplete" | "paused" => Some(Self::PastDue),
            "canceled" | "incomplete_expired" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_provider(s).ok_or_else(|| format!("unknown subscription status: {s}"))
    }
}

/// Subscription as reported by the billing provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Locally stored subscription row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: String,
    pub customer_id: String,
    pub subscription_id: String,
    pub price_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,

    /// Provider timestamp of the last webhook event applied to this row
    pub last_event_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    pub fn from_snapshot(user_id: impl Into<String>, snapshot: &SubscriptionSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            customer_id: snapshot.customer_id.clone(),
            subscription_id: snapshot.id.clone(),
            price_id: snapshot.price_id.clone(),
            status: snapshot.status,
            current_period_start: snapshot.current_period_start,
            current_period_end: snapshot.current_period_end,
            cancel_at_period_end: snapshot.cancel_at_period_end,
            last_event_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy provider-reported fields from a direct API response.
    ///
    /// A canceled row stays canceled.
    pub fn sync_from(&mut self, snapshot: &SubscriptionSnapshot, now: DateTime<Utc>) {
        if !self.status.is_terminal() {
            self.status = snapshot.status;
        }
        self.price_id.clone_from(&snapshot.price_id);
        self.current_period_start = snapshot.current_period_start;
        self.current_period_end = snapshot.current_period_end;
        self.cancel_at_period_end = snapshot.cancel_at_period_end;
        self.updated_at = now;
    }

    /// Build a new row for a subscription first seen through a webhook
    pub fn from_change(user_id: impl Into<String>, change: &SubscriptionChange, now: DateTime<Utc>) -> Option<Self> {
        let status = change.target_status()?;
        Some(Self {
            user_id: user_id.into(),
            customer_id: change.customer_id.clone().unwrap_or_default(),
            subscription_id: change.subscription_id.clone(),
            price_id: change.price_id.clone(),
            status,
            current_period_start: change.current_period_start,
            current_period_end: change.current_period_end,
            cancel_at_period_end: change.cancel_at_period_end.unwrap_or(false),
            last_event_at: Some(change.event_at),
            created_at: now,
            updated_at: now,
        })
    }
}

/// A webhook-driven change to one subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub subscription_id: String,
    pub customer_id: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub price_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,

    /// Subscription was deleted at the provider; cancels regardless of ordering
    pub deleted: bool,

    /// Provider timestamp of the event
    pub event_at: DateTime<Utc>,
}

impl SubscriptionChange {
    pub fn status(subscription_id: impl Into<String>, status: SubscriptionStatus, event_at: DateTime<Utc>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            customer_id: None,
            status: Some(status),
            price_id: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: None,
            deleted: false,
            event_at,
        }
    }

    pub fn deletion(subscription_id: impl Into<String>, event_at: DateTime<Utc>) -> Self {
        Self {
            deleted: true,
            ..Self::status(subscription_id, SubscriptionStatus::Canceled, event_at)
        }
    }

    pub const fn target_status(&self) -> Option<SubscriptionStatus> {
        if self.deleted {
            Some(SubscriptionStatus::Canceled)
        } else {
            self.status
        }
    }
}

/// Result of applying a change to a stored row
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Applied(SubscriptionRecord),
    /// Event is older than the last one applied
    Stale,
    /// Row is already canceled, or the change carries nothing new
    Unchanged,
}

pub fn apply_change(current: &SubscriptionRecord, change: &SubscriptionChange, now: DateTime<Utc>) -> Transition {
    if current.status.is_terminal() {
        return Transition::Unchanged;
    }

    let mut next = current.clone();
    if change.deleted {
        next.status = SubscriptionStatus::Canceled;
        next.cancel_at_period_end = false;
    } else {
        if current.last_event_at.is_some_and(|last| change.event_at < last) {
            return Transition::Stale;
        }
        if let Some(status) = change.status {
            next.status = status;
        }
        if change.price_id.is_some() {
            next.price_id.clone_from(&change.price_id);
        }
        if change.current_period_start.is_some() {
            next.current_period_start = change.current_period_start;
        }
        if change.current_period_end.is_some() {
            next.current_period_end = change.current_period_end;
        }
        if let Some(flag) = change.cancel_at_period_end {
            next.cancel_at_period_end = flag;
        }
    }

    next.last_event_at = Some(current.last_event_at.map_or(change.event_at, |last| last.max(change.event_at)));
    next.updated_at = now;
    Transition::Applied(next)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

impl PaymentOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for PaymentOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown payment outcome: {other}")),
        }
    }
}

/// Append-only record of a provider payment event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub user_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,

    /// Invoice or payment intent id
    pub provider_reference: String,

    /// Amount in minor currency units (cents)
    pub amount_minor: i64,
    pub currency: String,
    pub outcome: PaymentOutcome,
    pub event_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(status: SubscriptionStatus, last_event_at: Option<DateTime<Utc>>) -> SubscriptionRecord {
        let now = Utc::now();
        SubscriptionRecord {
            user_id: "u1".into(),
            customer_id: "cus_1".into(),
            subscription_id: "sub_1".into(),
            price_id: None,
            status,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            last_event_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_provider_status_mapping() {
        assert_eq!(SubscriptionStatus::from_provider("unpaid"), Some(SubscriptionStatus::PastDue));
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete_expired"),
            Some(SubscriptionStatus::Canceled)
        );
        assert_eq!(SubscriptionStatus::from_provider("bogus"), None);
        assert_eq!(SubscriptionStatus::PastDue.to_string(), "past_due");
    }

    #[test]
    fn test_newer_event_applies() {
        let t0 = Utc::now();
        let current = record(SubscriptionStatus::Trialing, Some(t0));
        let change = SubscriptionChange::status("sub_1", SubscriptionStatus::Active, t0 + Duration::seconds(5));

        let Transition::Applied(next) = apply_change(&current, &change, Utc::now()) else {
            panic!("expected transition");
        };
        assert_eq!(next.status, SubscriptionStatus::Active);
        assert_eq!(next.last_event_at, Some(t0 + Duration::seconds(5)));
    }

    #[test]
    fn test_older_event_is_stale() {
        let t0 = Utc::now();
        let current = record(SubscriptionStatus::Active, Some(t0));
        let change = SubscriptionChange::status("sub_1", SubscriptionStatus::PastDue, t0 - Duration::seconds(60));
        assert_eq!(apply_change(&current, &change, Utc::now()), Transition::Stale);
    }

    #[test]
    fn test_deletion_cancels_even_when_out_of_order() {
        let t0 = Utc::now();
        for status in [SubscriptionStatus::Trialing, SubscriptionStatus::Active, SubscriptionStatus::PastDue] {
            let current = record(status, Some(t0));
            let change = SubscriptionChange::deletion("sub_1", t0 - Duration::hours(1));
            let Transition::Applied(next) = apply_change(&current, &change, Utc::now()) else {
                panic!("deletion must apply");
            };
            assert_eq!(next.status, SubscriptionStatus::Canceled);
            assert_eq!(next.last_event_at, Some(t0));
        }
    }

    #[test]
    fn test_canceled_is_terminal() {
        let current = record(SubscriptionStatus::Canceled, None);
        let revive = SubscriptionChange::status("sub_1", SubscriptionStatus::Active, Utc::now());
        assert_eq!(apply_change(&current, &revive, Utc::now()), Transition::Unchanged);

        let delete_again = SubscriptionChange::deletion("sub_1", Utc::now());
        assert_eq!(apply_change(&current, &delete_again, Utc::now()), Transition::Unchanged);
    }
}
