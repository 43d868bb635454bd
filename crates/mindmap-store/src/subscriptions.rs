//! Subscriptions, payments and processed webhook events.
//!
//! A webhook event is applied inside one transaction: the event id insert,
//! the subscription upsert and the payment row commit together, so a replayed
//! or concurrent duplicate can never apply twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mindmap_payments::{
    EventEffect, PaymentRecord, ProcessedEvent, SubscriptionRecord, SubscriptionStore, WebhookOutcome,
    resolve_effect,
};
use sqlx::SqliteConnection;

use crate::db::Database;
use crate::error::{Result, StoreError};

const SUBSCRIPTION_COLUMNS: &str = "subscription_id, user_id, customer_id, price_id, status, \
     current_period_start, current_period_end, cancel_at_period_end, last_event_at, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, user_id, subscription_id, customer_id, provider_reference, amount_minor, \
     currency, outcome, event_id, created_at";

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    subscription_id: String,
    user_id: String,
    customer_id: String,
    price_id: Option<String>,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    last_event_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self> {
        Ok(Self {
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            user_id: row.user_id,
            customer_id: row.customer_id,
            subscription_id: row.subscription_id,
            price_id: row.price_id,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            last_event_at: row.last_event_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: String,
    user_id: Option<String>,
    subscription_id: Option<String>,
    customer_id: Option<String>,
    provider_reference: String,
    amount_minor: i64,
    currency: String,
    outcome: String,
    event_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        Ok(Self {
            outcome: row.outcome.parse().map_err(StoreError::Corrupt)?,
            id: row.id,
            user_id: row.user_id,
            subscription_id: row.subscription_id,
            customer_id: row.customer_id,
            provider_reference: row.provider_reference,
            amount_minor: row.amount_minor,
            currency: row.currency,
            event_id: row.event_id,
            created_at: row.created_at,
        })
    }
}

async fn fetch_subscription(conn: &mut SqliteConnection, subscription_id: &str) -> Result<Option<SubscriptionRecord>> {
    sqlx::query_as::<_, SubscriptionRow>(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE subscription_id = ?"
    ))
    .bind(subscription_id)
    .fetch_optional(conn)
    .await?
    .map(SubscriptionRecord::try_from)
    .transpose()
}

/// Local user owning a provider customer, via the user row or an earlier subscription
async fn customer_owner(conn: &mut SqliteConnection, customer_id: &str) -> Result<Option<String>> {
    let owner = sqlx::query_scalar::<_, String>(
        "SELECT id FROM users WHERE customer_id = ?1 \
         UNION ALL SELECT user_id FROM subscriptions WHERE customer_id = ?1 \
         LIMIT 1",
    )
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;
    Ok(owner)
}

/// Insert or update a subscription row.
///
/// A canceled row is never overwritten and `last_event_at` never moves
/// backwards. Returns whether a row was written.
async fn upsert_subscription(conn: &mut SqliteConnection, record: &SubscriptionRecord) -> Result<bool> {
    let written = sqlx::query(&format!(
        "INSERT INTO subscriptions ({SUBSCRIPTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (subscription_id) DO UPDATE SET \
            customer_id = excluded.customer_id, \
            price_id = excluded.price_id, \
            status = excluded.status, \
            current_period_start = excluded.current_period_start, \
            current_period_end = excluded.current_period_end, \
            cancel_at_period_end = excluded.cancel_at_period_end, \
            last_event_at = CASE \
                WHEN subscriptions.last_event_at IS NULL OR excluded.last_event_at > subscriptions.last_event_at \
                THEN excluded.last_event_at ELSE subscriptions.last_event_at END, \
            updated_at = excluded.updated_at \
         WHERE subscriptions.status <> 'canceled'"
    ))
    .bind(&record.subscription_id)
    .bind(&record.user_id)
    .bind(&record.customer_id)
    .bind(&record.price_id)
    .bind(record.status.as_str())
    .bind(record.current_period_start)
    .bind(record.current_period_end)
    .bind(record.cancel_at_period_end)
    .bind(record.last_event_at)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut *conn)
    .await?;

    if written.rows_affected() == 0 {
        tracing::debug!(subscription_id = %record.subscription_id, "Canceled subscription left as is");
        return Ok(false);
    }

    // customer_id is unique across users; a customer owned elsewhere is left alone
    sqlx::query(
        "UPDATE users SET subscription_id = ?1, \
            customer_id = CASE \
                WHEN customer_id IS NULL AND ?2 <> '' \
                    AND NOT EXISTS (SELECT 1 FROM users AS other WHERE other.customer_id = ?2) \
                THEN ?2 ELSE customer_id END \
         WHERE id = ?3",
    )
    .bind(&record.subscription_id)
    .bind(&record.customer_id)
    .bind(&record.user_id)
    .execute(&mut *conn)
    .await?;
    Ok(true)
}

/// Point a user at a provider customer unless another user already owns it.
///
/// Returns false when nothing was linked.
async fn link_customer_once(conn: &mut SqliteConnection, user_id: &str, customer_id: &str) -> Result<bool> {
    let linked = sqlx::query(
        "UPDATE users SET customer_id = ?1 WHERE id = ?2 \
         AND NOT EXISTS (SELECT 1 FROM users AS other WHERE other.customer_id = ?1 AND other.id <> ?2)",
    )
    .bind(customer_id)
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(linked.rows_affected() > 0)
}

async fn user_exists(conn: &mut SqliteConnection, user_id: &str) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(found > 0)
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &PaymentRecord) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&payment.id)
    .bind(&payment.user_id)
    .bind(&payment.subscription_id)
    .bind(&payment.customer_id)
    .bind(&payment.provider_reference)
    .bind(payment.amount_minor)
    .bind(&payment.currency)
    .bind(payment.outcome.as_str())
    .bind(&payment.event_id)
    .bind(payment.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

impl Database {
    pub async fn record_payment(&self, payment: &PaymentRecord) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        insert_payment(&mut conn, payment).await
    }

    /// Number of webhook events seen so far
    pub async fn processed_event_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM processed_events")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn apply_event_tx(&self, event: &ProcessedEvent, effect: &EventEffect) -> Result<WebhookOutcome> {
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO processed_events (event_id, event_type, occurred_at, outcome, received_at) \
             VALUES (?, ?, ?, 'pending', ?) ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(event.occurred_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(WebhookOutcome::Duplicate);
        }

        let existing = match effect.subscription_id() {
            Some(id) => fetch_subscription(&mut tx, id).await?,
            None => None,
        };
        let owner = match effect.customer_id() {
            Some(id) => customer_owner(&mut tx, id).await?,
            None => None,
        };

        let mut resolution = resolve_effect(effect, existing.as_ref(), owner.as_deref(), Utc::now());

        if let Some(link) = &resolution.link {
            if !link_customer_once(&mut tx, &link.user_id, &link.customer_id).await? {
                if user_exists(&mut tx, &link.user_id).await? {
                    tracing::warn!(
                        user_id = %link.user_id,
                        customer_id = %link.customer_id,
                        "Customer already linked to another user"
                    );
                } else {
                    tracing::warn!(user_id = %link.user_id, customer_id = %link.customer_id, "Checkout for unknown user");
                    // no user row to hang a subscription on
                    if resolution.upsert.as_ref().is_some_and(|r| r.user_id == link.user_id) {
                        resolution.upsert = None;
                    }
                }
            }
        }
        if let Some(record) = &resolution.upsert {
            upsert_subscription(&mut tx, record).await?;
        }
        if let Some(payment) = &resolution.payment {
            insert_payment(&mut tx, payment).await?;
        }

        sqlx::query("UPDATE processed_events SET outcome = ? WHERE event_id = ?")
            .bind(resolution.outcome.as_str())
            .bind(&event.event_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(resolution.outcome)
    }
}

#[async_trait]
impl SubscriptionStore for Database {
    async fn upsert(&self, record: &SubscriptionRecord) -> mindmap_payments::Result<()> {
        let mut tx = self.pool().begin().await.map_err(StoreError::from)?;
        upsert_subscription(&mut tx, record).await?;
        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn get(&self, subscription_id: &str) -> mindmap_payments::Result<Option<SubscriptionRecord>> {
        let mut conn = self.pool().acquire().await.map_err(StoreError::from)?;
        Ok(fetch_subscription(&mut conn, subscription_id).await?)
    }

    async fn find_by_user(&self, user_id: &str) -> mindmap_payments::Result<Option<SubscriptionRecord>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = ? ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from)?;
        Ok(row.map(SubscriptionRecord::try_from).transpose()?)
    }

    async fn link_customer(&self, user_id: &str, customer_id: &str) -> mindmap_payments::Result<()> {
        Ok(self.set_customer_id(user_id, customer_id).await?)
    }

    async fn apply_event(&self, event: &ProcessedEvent, effect: &EventEffect) -> mindmap_payments::Result<WebhookOutcome> {
        Ok(self.apply_event_tx(event, effect).await?)
    }

    async fn payments_for_user(&self, user_id: &str) -> mindmap_payments::Result<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from)?;
        Ok(rows
            .into_iter()
            .map(PaymentRecord::try_from)
            .collect::<Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use chrono::Duration;
    use mindmap_payments::{CustomerLink, PaymentOutcome, SubscriptionChange, SubscriptionStatus};

    async fn add_user(db: &Database, username: &str) -> String {
        db.create_user(
            &NewUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                password_hash: "hash".into(),
            },
            Utc::now(),
        )
        .await
        .unwrap()
        .id
    }

    async fn db_with_user() -> (Database, String) {
        let db = Database::in_memory().await.unwrap();
        let user_id = add_user(&db, "ada").await;
        (db, user_id)
    }

    fn checkout(user_id: &str, customer_id: &str, subscription_id: Option<&str>) -> EventEffect {
        EventEffect {
            link: Some(CustomerLink {
                user_id: user_id.into(),
                customer_id: customer_id.into(),
                subscription_id: subscription_id.map(str::to_string),
                status: SubscriptionStatus::Trialing,
            }),
            ..EventEffect::default()
        }
    }

    fn record(user_id: &str, status: SubscriptionStatus) -> SubscriptionRecord {
        let now = Utc::now();
        SubscriptionRecord {
            user_id: user_id.into(),
            customer_id: "cus_1".into(),
            subscription_id: "sub_1".into(),
            price_id: Some("price_monthly".into()),
            status,
            current_period_start: Some(now),
            current_period_end: Some(now + Duration::days(30)),
            cancel_at_period_end: false,
            last_event_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn event(id: &str, at: DateTime<Utc>) -> ProcessedEvent {
        ProcessedEvent {
            event_id: id.into(),
            event_type: "customer.subscription.updated".into(),
            occurred_at: at,
        }
    }

    fn status_effect(status: SubscriptionStatus, at: DateTime<Utc>) -> EventEffect {
        EventEffect {
            change: Some(SubscriptionChange::status("sub_1", status, at)),
            ..EventEffect::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_links_user() {
        let (db, user_id) = db_with_user().await;
        db.upsert(&record(&user_id, SubscriptionStatus::Trialing)).await.unwrap();

        let stored = db.find_by_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Trialing);
        let user = db.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(user.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(user.customer_id.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn test_replay_applies_once() {
        let (db, user_id) = db_with_user().await;
        db.upsert(&record(&user_id, SubscriptionStatus::Trialing)).await.unwrap();
        let at = Utc::now();

        let first = db
            .apply_event(&event("evt_1", at), &status_effect(SubscriptionStatus::Active, at))
            .await
            .unwrap();
        let replay = db
            .apply_event(&event("evt_1", at), &status_effect(SubscriptionStatus::PastDue, at))
            .await
            .unwrap();

        assert_eq!(first, WebhookOutcome::Applied);
        assert_eq!(replay, WebhookOutcome::Duplicate);
        assert_eq!(db.get("sub_1").await.unwrap().unwrap().status, SubscriptionStatus::Active);
        assert_eq!(db.processed_event_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_event_keeps_newer_status() {
        let (db, user_id) = db_with_user().await;
        db.upsert(&record(&user_id, SubscriptionStatus::Trialing)).await.unwrap();
        let t0 = Utc::now();

        db.apply_event(&event("evt_2", t0), &status_effect(SubscriptionStatus::Active, t0))
            .await
            .unwrap();
        let older = t0 - Duration::minutes(5);
        let outcome = db
            .apply_event(&event("evt_1", older), &status_effect(SubscriptionStatus::PastDue, older))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Stale);
        assert_eq!(db.get("sub_1").await.unwrap().unwrap().status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_deletion_is_terminal() {
        let (db, user_id) = db_with_user().await;
        db.upsert(&record(&user_id, SubscriptionStatus::PastDue)).await.unwrap();
        let at = Utc::now();

        let delete = EventEffect {
            change: Some(SubscriptionChange::deletion("sub_1", at)),
            ..EventEffect::default()
        };
        assert_eq!(db.apply_event(&event("evt_del", at), &delete).await.unwrap(), WebhookOutcome::Applied);

        let later = at + Duration::minutes(1);
        let revive = db
            .apply_event(&event("evt_up", later), &status_effect(SubscriptionStatus::Active, later))
            .await
            .unwrap();
        assert_eq!(revive, WebhookOutcome::Ignored);
        assert_eq!(db.get("sub_1").await.unwrap().unwrap().status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn test_unknown_subscription_changes_nothing() {
        let (db, _) = db_with_user().await;
        let at = Utc::now();
        let outcome = db
            .apply_event(&event("evt_1", at), &status_effect(SubscriptionStatus::Active, at))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::UnknownSubscription);
        assert!(db.get("sub_1").await.unwrap().is_none());
        assert_eq!(db.processed_event_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_checkout_link_then_adoption() {
        let (db, user_id) = db_with_user().await;
        let at = Utc::now();

        let link = EventEffect {
            link: Some(CustomerLink {
                user_id: user_id.clone(),
                customer_id: "cus_9".into(),
                subscription_id: None,
                status: SubscriptionStatus::Active,
            }),
            ..EventEffect::default()
        };
        db.apply_event(&event("evt_cs", at), &link).await.unwrap();

        let mut change = SubscriptionChange::status("sub_9", SubscriptionStatus::Active, at);
        change.customer_id = Some("cus_9".into());
        let created = EventEffect {
            change: Some(change),
            ..EventEffect::default()
        };
        assert_eq!(db.apply_event(&event("evt_sub", at), &created).await.unwrap(), WebhookOutcome::Applied);

        let stored = db.find_by_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.subscription_id, "sub_9");
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_payment_history() {
        let (db, user_id) = db_with_user().await;
        db.upsert(&record(&user_id, SubscriptionStatus::Active)).await.unwrap();
        let at = Utc::now();

        let effect = EventEffect {
            change: Some(SubscriptionChange::status("sub_1", SubscriptionStatus::PastDue, at)),
            payment: Some(PaymentRecord {
                id: "pay_1".into(),
                user_id: None,
                subscription_id: Some("sub_1".into()),
                customer_id: Some("cus_1".into()),
                provider_reference: "in_1".into(),
                amount_minor: 999,
                currency: "usd".into(),
                outcome: PaymentOutcome::Failed,
                event_id: "evt_inv".into(),
                created_at: at,
            }),
            link: None,
        };
        db.apply_event(&event("evt_inv", at), &effect).await.unwrap();

        let payments = db.payments_for_user(&user_id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].outcome, PaymentOutcome::Failed);
        assert_eq!(db.get("sub_1").await.unwrap().unwrap().status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn test_checkout_after_subscription_event_creates_row() {
        let (db, user_id) = db_with_user().await;
        let at = Utc::now();

        let mut change = SubscriptionChange::status("sub_5", SubscriptionStatus::Trialing, at);
        change.customer_id = Some("cus_5".into());
        let created = EventEffect {
            change: Some(change),
            ..EventEffect::default()
        };
        assert_eq!(
            db.apply_event(&event("evt_sub", at), &created).await.unwrap(),
            WebhookOutcome::UnknownSubscription
        );

        let later = at + Duration::seconds(1);
        let outcome = db
            .apply_event(&event("evt_cs", later), &checkout(&user_id, "cus_5", Some("sub_5")))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Applied);

        let stored = db.find_by_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.subscription_id, "sub_5");
        assert_eq!(stored.status, SubscriptionStatus::Trialing);
        let user = db.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(user.customer_id.as_deref(), Some("cus_5"));
        assert_eq!(user.subscription_id.as_deref(), Some("sub_5"));

        let mut change = SubscriptionChange::status("sub_5", SubscriptionStatus::Active, later);
        change.customer_id = Some("cus_5".into());
        let paid = EventEffect {
            change: Some(change),
            ..EventEffect::default()
        };
        assert_eq!(db.apply_event(&event("evt_paid", later), &paid).await.unwrap(), WebhookOutcome::Applied);
        assert_eq!(db.get("sub_5").await.unwrap().unwrap().status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_checkout_for_unknown_user_is_recorded_without_row() {
        let (db, _) = db_with_user().await;
        let at = Utc::now();

        let outcome = db
            .apply_event(&event("evt_cs", at), &checkout("missing-user", "cus_5", Some("sub_5")))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Applied);
        assert!(db.get("sub_5").await.unwrap().is_none());
        assert_eq!(db.processed_event_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_never_revives_canceled_row() {
        let (db, user_id) = db_with_user().await;
        db.upsert(&record(&user_id, SubscriptionStatus::Active)).await.unwrap();
        let deleted_at = Utc::now();
        let delete = EventEffect {
            change: Some(SubscriptionChange::deletion("sub_1", deleted_at)),
            ..EventEffect::default()
        };
        db.apply_event(&event("evt_del", deleted_at), &delete).await.unwrap();

        // write-back from a read taken before the deletion landed
        db.upsert(&record(&user_id, SubscriptionStatus::Active)).await.unwrap();

        let stored = db.get("sub_1").await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Canceled);
        assert_eq!(stored.last_event_at, Some(deleted_at));
    }

    #[tokio::test]
    async fn test_upsert_never_lowers_last_event_at() {
        let (db, user_id) = db_with_user().await;
        let latest = Utc::now();
        let mut fresh = record(&user_id, SubscriptionStatus::Active);
        fresh.last_event_at = Some(latest);
        db.upsert(&fresh).await.unwrap();

        let mut older = record(&user_id, SubscriptionStatus::Active);
        older.last_event_at = Some(latest - Duration::minutes(5));
        db.upsert(&older).await.unwrap();
        let mut unset = record(&user_id, SubscriptionStatus::Active);
        unset.last_event_at = None;
        db.upsert(&unset).await.unwrap();

        assert_eq!(db.get("sub_1").await.unwrap().unwrap().last_event_at, Some(latest));

        // an event between the two timestamps is still stale
        let between = latest - Duration::minutes(1);
        let outcome = db
            .apply_event(&event("evt_old", between), &status_effect(SubscriptionStatus::PastDue, between))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Stale);
    }

    #[tokio::test]
    async fn test_checkout_for_customer_owned_by_another_user() {
        let (db, owner_id) = db_with_user().await;
        db.set_customer_id(&owner_id, "cus_1").await.unwrap();
        let other_id = add_user(&db, "grace").await;
        let at = Utc::now();

        let outcome = db
            .apply_event(&event("evt_cs", at), &checkout(&other_id, "cus_1", None))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Applied);

        let owner = db.get_user(&owner_id).await.unwrap().unwrap();
        assert_eq!(owner.customer_id.as_deref(), Some("cus_1"));
        let other = db.get_user(&other_id).await.unwrap().unwrap();
        assert_eq!(other.customer_id, None);
    }

    #[tokio::test]
    async fn test_upsert_for_customer_owned_by_another_user() {
        let (db, owner_id) = db_with_user().await;
        db.set_customer_id(&owner_id, "cus_1").await.unwrap();
        let other_id = add_user(&db, "grace").await;

        db.upsert(&record(&other_id, SubscriptionStatus::Active)).await.unwrap();

        let other = db.get_user(&other_id).await.unwrap().unwrap();
        assert_eq!(other.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(other.customer_id, None);
    }
}
