// Wire models shared by the HTTP surface and the service components
// Author: kelexine (https://github.com/kelexine)

pub mod intelligence;
pub mod report;
pub mod subscription;

pub use intelligence::*;
pub use report::*;
pub use subscription::*;

use serde::{Deserialize, Serialize};

/// Error taxonomy surfaced in every failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    SubscriptionRequired,
    UsageLimitExceeded,
    PaymentRequired,
    NotFound,
    Conflict,
    InvalidInput,
    ValidationError,
    PerplexityError,
    StripeError,
    PdfGenerationError,
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::SubscriptionRequired => "SUBSCRIPTION_REQUIRED",
            ErrorCode::UsageLimitExceeded => "USAGE_LIMIT_EXCEEDED",
            ErrorCode::PaymentRequired => "PAYMENT_REQUIRED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::PerplexityError => "PERPLEXITY_ERROR",
            ErrorCode::StripeError => "STRIPE_ERROR",
            ErrorCode::PdfGenerationError => "PDF_GENERATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// Envelope wrapping every JSON response: `{success, data?, error?, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiErrorBody {
                code,
                message: message.into(),
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
