//! Access Policy
//!
//! A user may generate mind maps while their trial is running or while their
//! subscription is active.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::subscription::{SubscriptionRecord, SubscriptionStatus};

pub const TRIAL_DAYS: i64 = 14;

pub fn trial_end(registered_at: DateTime<Utc>) -> DateTime<Utc> {
    registered_at + Duration::days(TRIAL_DAYS)
}

pub fn has_access(now: DateTime<Utc>, trial_end: DateTime<Utc>, status: Option<SubscriptionStatus>) -> bool {
    now < trial_end || status == Some(SubscriptionStatus::Active)
}

/// Whole days left in the trial, zero once it has ended
pub fn remaining_trial_days(now: DateTime<Utc>, trial_end: DateTime<Utc>) -> u32 {
    u32::try_from((trial_end - now).num_days().max(0)).unwrap_or(0)
}

/// What the dashboard shows about a user's access
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessStatus {
    pub trial_ends_at: DateTime<Utc>,
    pub in_trial: bool,
    pub trial_days_left: u32,
    pub subscription_status: Option<SubscriptionStatus>,
    pub cancel_at_period_end: bool,
    pub has_access: bool,
}

impl AccessStatus {
    pub fn evaluate(now: DateTime<Utc>, trial_end: DateTime<Utc>, subscription: Option<&SubscriptionRecord>) -> Self {
        let status = subscription.map(|s| s.status);
        Self {
            trial_ends_at: trial_end,
            in_trial: now < trial_end,
            trial_days_left: remaining_trial_days(now, trial_end),
            subscription_status: status,
            cancel_at_period_end: subscription.is_some_and(|s| s.cancel_at_period_end),
            has_access: has_access(now, trial_end, status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_is_fourteen_days() {
        let registered = Utc::now();
        assert_eq!(trial_end(registered) - registered, Duration::days(14));
    }

    #[test]
    fn test_access_rule() {
        let registered = Utc::now() - Duration::days(20);
        let end = trial_end(registered);
        let during = registered + Duration::days(3);
        let after = registered + Duration::days(15);

        assert!(has_access(during, end, None));
        assert!(has_access(during, end, Some(SubscriptionStatus::PastDue)));
        assert!(!has_access(end, end, None));
        assert!(!has_access(after, end, Some(SubscriptionStatus::Trialing)));
        assert!(!has_access(after, end, Some(SubscriptionStatus::PastDue)));
        assert!(!has_access(after, end, Some(SubscriptionStatus::Canceled)));
        assert!(has_access(after, end, Some(SubscriptionStatus::Active)));
    }

    #[test]
    fn test_remaining_days() {
        let now = Utc::now();
        assert_eq!(remaining_trial_days(now, now + Duration::days(14)), 14);
        assert_eq!(remaining_trial_days(now, now + Duration::hours(30)), 1);
        assert_eq!(remaining_trial_days(now, now - Duration::days(2)), 0);
    }

    #[test]
    fn test_status_summary() {
        let now = Utc::now();
        let status = AccessStatus::evaluate(now, now - Duration::days(1), None);
        assert!(!status.in_trial);
        assert!(!status.has_access);
        assert_eq!(status.trial_days_left, 0);
    }
}
