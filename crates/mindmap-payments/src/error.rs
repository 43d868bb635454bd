//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Could not reach the payment provider
    #[error("Payment provider unreachable: {0}")]
    Network(String),

    /// Card or payment method was declined
    #[error("Payment declined: {0}")]
    Declined(String),

    /// Customer or subscription does not exist at the provider
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the provider
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Any other provider-side failure
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited | Self::Storage(_))
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => "We couldn't reach the payment provider. Please try again.",
            Self::Declined(_) => "Your payment method was declined.",
            Self::NotFound(_) => "No matching subscription was found.",
            Self::RateLimited => "Too many billing requests. Please wait a moment.",
            Self::Config(_) => "Billing is not configured on this server.",
            _ => "An error occurred processing your request.",
        }
    }
}
