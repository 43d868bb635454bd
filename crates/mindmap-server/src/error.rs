//! API errors, rendered as `{ "error": ..., "code": ... }`

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mindmap_generator::GenerationError;
use mindmap_payments::PaymentError;
use mindmap_store::StoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthenticated,

    /// Trial over and no active subscription
    #[error("Subscription required")]
    PaymentRequired,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Billing is not configured")]
    BillingDisabled,

    #[error(transparent)]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Store(other),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Generation(err) => match err {
                GenerationError::EmptyInput | GenerationError::Document(_) => StatusCode::BAD_REQUEST,
                GenerationError::MalformedOutput(_) => StatusCode::UNPROCESSABLE_ENTITY,
                GenerationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                GenerationError::Provider(core) => match core {
                    mindmap_core::CoreError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                    mindmap_core::CoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                },
            },
            Self::Payment(err) => match err {
                PaymentError::WebhookSignature(_) | PaymentError::WebhookParse(_) => StatusCode::BAD_REQUEST,
                PaymentError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
                PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
                PaymentError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                PaymentError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
                PaymentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                PaymentError::Network(_) | PaymentError::Provider(_) => StatusCode::BAD_GATEWAY,
            },
            Self::BillingDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::PaymentRequired => "SUBSCRIPTION_REQUIRED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Generation(GenerationError::EmptyInput) => "EMPTY_INPUT",
            Self::Generation(GenerationError::Document(_)) => "DOCUMENT_ERROR",
            Self::Generation(GenerationError::MalformedOutput(_)) => "MALFORMED_OUTPUT",
            Self::Generation(GenerationError::Timeout { .. }) => "MODEL_TIMEOUT",
            Self::Generation(GenerationError::Provider(_)) => "MODEL_ERROR",
            Self::Payment(PaymentError::WebhookSignature(_)) => "INVALID_SIGNATURE",
            Self::Payment(PaymentError::WebhookParse(_)) => "INVALID_PAYLOAD",
            Self::Payment(_) => "BILLING_ERROR",
            Self::BillingDisabled => "PAYMENTS_DISABLED",
            Self::Store(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Generation(err) => err.user_message(),
            Self::Payment(err) => err.user_message().to_string(),
            Self::Store(_) | Self::Internal(_) => "An internal error occurred.".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "Client error");
        }

        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
