// Error types for the sentimark service
// Author: kelexine (https://github.com/kelexine)

use crate::models::{ApiResponse, ErrorCode};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    SubscriptionRequired(String),

    #[error("{0}")]
    UsageLimitExceeded(String),

    #[error("Perplexity API error ({status}): {body}")]
    PerplexityStatus { status: u16, body: String },

    #[error("Perplexity request failed: {0}")]
    Perplexity(String),

    #[error("Stripe API error ({status}): {message}")]
    StripeStatus { status: u16, message: String },

    #[error("Stripe request failed: {0}")]
    Stripe(String),

    #[error("PDF generation failed: {0}")]
    PdfGeneration(String),

    #[error("Webhook signature verification failed: {0}")]
    WebhookSignature(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Taxonomy code reported in the response envelope.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidInput(_) | AppError::WebhookSignature(_) => ErrorCode::InvalidInput,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::SubscriptionRequired(_) => ErrorCode::SubscriptionRequired,
            AppError::UsageLimitExceeded(_) => ErrorCode::UsageLimitExceeded,
            AppError::PerplexityStatus { .. } | AppError::Perplexity(_) => {
                ErrorCode::PerplexityError
            }
            AppError::StripeStatus { .. } | AppError::Stripe(_) => ErrorCode::StripeError,
            AppError::PdfGeneration(_) => ErrorCode::PdfGenerationError,
            AppError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
            AppError::Config(_)
            | AppError::ConfigParsing(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            ErrorCode::InvalidInput | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::Forbidden | ErrorCode::SubscriptionRequired => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::UsageLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::PerplexityError
            | ErrorCode::StripeError
            | ErrorCode::PdfGenerationError
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Convert AppError to the uniform response envelope for Axum
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = crate::utils::logging::sanitize(&self.to_string());

        if status.is_server_error() {
            tracing::error!(code = code.as_str(), "{}", message);
        } else {
            tracing::debug!(code = code.as_str(), "{}", message);
        }

        (status, axum::Json(ApiResponse::<()>::err(code, message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
