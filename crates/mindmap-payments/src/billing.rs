//! Billing Provider
//!
//! Direct calls to the payment provider for customers, subscriptions and the
//! hosted checkout page. Nothing here retries; callers see typed errors.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use stripe::{
    CancelSubscription, CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionSubscriptionData,
    CreateCustomer, CreateSubscription, CreateSubscriptionItems, Customer, CustomerId, StripeError,
    Subscription, SubscriptionId, UpdateSubscription,
};
use tokio::sync::Mutex;

use crate::error::{PaymentError, Result};
use crate::subscription::{SubscriptionSnapshot, SubscriptionStatus};

/// How to cancel a subscription
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelMode {
    /// Keep access until the paid period ends
    #[default]
    AtPeriodEnd,
    Immediately,
}

/// Request to create a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Customer email, used when no customer exists yet
    pub customer_email: Option<String>,

    /// Existing provider customer
    #[serde(default)]
    pub customer_id: Option<String>,

    pub price_id: String,

    /// Local user id, echoed back by `checkout.session.completed`
    pub user_id: String,

    /// Provider-side trial length
    #[serde(default)]
    pub trial_days: Option<u32>,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,

    /// URL to redirect user to
    pub checkout_url: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create a provider customer, returning its id
    async fn create_customer(&self, email: &str, name: &str) -> Result<String>;

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        trial_days: Option<u32>,
    ) -> Result<SubscriptionSnapshot>;

    async fn cancel_subscription(&self, subscription_id: &str, mode: CancelMode) -> Result<SubscriptionSnapshot>;

    /// Undo a scheduled cancellation
    async fn reactivate_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot>;

    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot>;

    /// Create a hosted checkout page for a subscription
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;
}

/// Stripe-backed billing
pub struct StripeBilling {
    client: Client,
}

impl StripeBilling {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Create from `STRIPE_SECRET_KEY`
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;
        Ok(Self::new(&secret_key))
    }

    fn subscription_id(id: &str) -> Result<SubscriptionId> {
        SubscriptionId::from_str(id).map_err(|_| PaymentError::NotFound(format!("subscription {id}")))
    }

    fn customer_id(id: &str) -> Result<CustomerId> {
        CustomerId::from_str(id).map_err(|_| PaymentError::NotFound(format!("customer {id}")))
    }
}

fn map_stripe_error(err: StripeError) -> PaymentError {
    match err {
        StripeError::Stripe(request) => {
            let message = request.message.clone().unwrap_or_else(|| request.to_string());
            match request.http_status {
                402 => PaymentError::Declined(message),
                404 => PaymentError::NotFound(message),
                429 => PaymentError::RateLimited,
                _ => PaymentError::Provider(message),
            }
        }
        StripeError::Timeout | StripeError::ClientError(_) => PaymentError::Network(err.to_string()),
        other => PaymentError::Provider(other.to_string()),
    }
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn snapshot(subscription: &Subscription) -> Result<SubscriptionSnapshot> {
    let status = SubscriptionStatus::from_provider(subscription.status.as_str()).ok_or_else(|| {
        PaymentError::Provider(format!("unexpected subscription status {}", subscription.status))
    })?;
    let price_id = subscription
        .items
        .data
        .first()
        .and_then(|item| item.price.as_ref())
        .map(|price| price.id.to_string());

    Ok(SubscriptionSnapshot {
        id: subscription.id.to_string(),
        customer_id: subscription.customer.id().to_string(),
        status,
        price_id,
        current_period_start: from_unix(subscription.current_period_start),
        current_period_end: from_unix(subscription.current_period_end),
        trial_start: subscription.trial_start.and_then(from_unix),
        trial_end: subscription.trial_end.and_then(from_unix),
        cancel_at_period_end: subscription.cancel_at_period_end,
    })
}

#[async_trait]
impl BillingProvider for StripeBilling {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_customer(&self, email: &str, name: &str) -> Result<String> {
        let mut params = CreateCustomer::new();
        params.email = Some(email);
        params.name = Some(name);

        let customer = Customer::create(&self.client, params)
            .await
            .map_err(map_stripe_error)?;
        tracing::info!(customer_id = %customer.id, "Created Stripe customer");
        Ok(customer.id.to_string())
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        trial_days: Option<u32>,
    ) -> Result<SubscriptionSnapshot> {
        let mut params = CreateSubscription::new(Self::customer_id(customer_id)?);
        params.items = Some(vec![CreateSubscriptionItems {
            price: Some(price_id.to_string()),
            ..Default::default()
        }]);
        params.trial_period_days = trial_days.filter(|days| *days > 0);

        let subscription = Subscription::create(&self.client, params)
            .await
            .map_err(map_stripe_error)?;
        tracing::info!(
            subscription_id = %subscription.id,
            customer_id,
            status = %subscription.status,
            "Created Stripe subscription"
        );
        snapshot(&subscription)
    }

    async fn cancel_subscription(&self, subscription_id: &str, mode: CancelMode) -> Result<SubscriptionSnapshot> {
        let id = Self::subscription_id(subscription_id)?;
        let subscription = match mode {
            CancelMode::AtPeriodEnd => {
                let mut params = UpdateSubscription::new();
                params.cancel_at_period_end = Some(true);
                Subscription::update(&self.client, &id, params).await
            }
            CancelMode::Immediately => Subscription::cancel(&self.client, &id, CancelSubscription::new()).await,
        }
        .map_err(map_stripe_error)?;

        tracing::info!(subscription_id, ?mode, "Canceled Stripe subscription");
        snapshot(&subscription)
    }

    async fn reactivate_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot> {
        let id = Self::subscription_id(subscription_id)?;
        let mut params = UpdateSubscription::new();
        params.cancel_at_period_end = Some(false);

        let subscription = Subscription::update(&self.client, &id, params)
            .await
            .map_err(map_stripe_error)?;
        snapshot(&subscription)
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot> {
        let id = Self::subscription_id(subscription_id)?;
        let subscription = Subscription::retrieve(&self.client, &id, &[])
            .await
            .map_err(map_stripe_error)?;
        snapshot(&subscription)
    }

    /// Returns a URL to redirect the user to Stripe's hosted checkout page.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let mut params = CreateCheckoutSession::new();
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.mode = Some(CheckoutSessionMode::Subscription);
        params.client_reference_id = Some(&request.user_id);
        params.allow_promotion_codes = Some(true);

        match &request.customer_id {
            Some(customer_id) => params.customer = Some(Self::customer_id(customer_id)?),
            None => params.customer_email = request.customer_email.as_deref(),
        }

        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), request.user_id.clone());
        params.metadata = Some(metadata.clone());
        params.subscription_data = Some(CreateCheckoutSessionSubscriptionData {
            trial_period_days: request.trial_days.filter(|days| *days > 0),
            metadata: Some(metadata),
            ..Default::default()
        });
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(request.price_id.clone()),
            quantity: Some(1),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(map_stripe_error)?;
        let checkout_url = session
            .url
            .ok_or_else(|| PaymentError::Provider("No checkout URL returned".into()))?;

        Ok(CheckoutSession {
            id: session.id.to_string(),
            checkout_url,
        })
    }
}

#[derive(Default)]
struct MockState {
    next_id: u32,
    customers: HashMap<String, String>,
    subscriptions: HashMap<String, SubscriptionSnapshot>,
    fail_next: Option<PaymentError>,
}

impl MockState {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_mock_{}", self.next_id)
    }

    fn take_failure(&mut self) -> Result<()> {
        self.fail_next.take().map_or(Ok(()), Err)
    }

    fn subscription_mut(&mut self, id: &str) -> Result<&mut SubscriptionSnapshot> {
        self.subscriptions
            .get_mut(id)
            .ok_or_else(|| PaymentError::NotFound(format!("subscription {id}")))
    }
}

/// In-memory billing provider (for development/testing)
#[derive(Default)]
pub struct MockBillingProvider {
    state: Mutex<MockState>,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with `error`
    pub async fn fail_next(&self, error: PaymentError) {
        self.state.lock().await.fail_next = Some(error);
    }

    /// Overwrite a subscription's status, as if the provider changed it
    pub async fn set_status(&self, subscription_id: &str, status: SubscriptionStatus) -> Result<()> {
        self.state.lock().await.subscription_mut(subscription_id)?.status = status;
        Ok(())
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_customer(&self, email: &str, _name: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        let id = state.next("cus");
        state.customers.insert(id.clone(), email.to_string());
        Ok(id)
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        trial_days: Option<u32>,
    ) -> Result<SubscriptionSnapshot> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        if !state.customers.contains_key(customer_id) {
            return Err(PaymentError::NotFound(format!("customer {customer_id}")));
        }

        let now = Utc::now();
        let trial = trial_days.filter(|days| *days > 0).map(|days| now + Duration::days(i64::from(days)));
        let period_end = trial.unwrap_or(now + Duration::days(30));
        let snapshot = SubscriptionSnapshot {
            id: state.next("sub"),
            customer_id: customer_id.to_string(),
            status: if trial.is_some() {
                SubscriptionStatus::Trialing
            } else {
                SubscriptionStatus::Active
            },
            price_id: Some(price_id.to_string()),
            current_period_start: Some(now),
            current_period_end: Some(period_end),
            trial_start: trial.map(|_| now),
            trial_end: trial,
            cancel_at_period_end: false,
        };
        state.subscriptions.insert(snapshot.id.clone(), snapshot.clone());
        Ok(snapshot)
    }

    async fn cancel_subscription(&self, subscription_id: &str, mode: CancelMode) -> Result<SubscriptionSnapshot> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        let subscription = state.subscription_mut(subscription_id)?;
        match mode {
            CancelMode::AtPeriodEnd => subscription.cancel_at_period_end = true,
            CancelMode::Immediately => {
                subscription.status = SubscriptionStatus::Canceled;
                subscription.cancel_at_period_end = false;
            }
        }
        Ok(subscription.clone())
    }

    async fn reactivate_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        let subscription = state.subscription_mut(subscription_id)?;
        if subscription.status.is_terminal() {
            return Err(PaymentError::Provider("subscription is canceled".into()));
        }
        subscription.cancel_at_period_end = false;
        Ok(subscription.clone())
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        Ok(state.subscription_mut(subscription_id)?.clone())
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        let id = state.next("cs");
        Ok(CheckoutSession {
            checkout_url: format!("{}?session_id={id}", request.success_url),
            id,
        })
    }
}
