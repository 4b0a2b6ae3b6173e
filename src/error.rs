use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{models::SupplierKind, transport::TransportError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{supplier} rejected the request: {message}")]
    UpstreamClient { supplier: SupplierKind, status: Option<u16>, message: String },

    #[error("{supplier} did not respond in time")]
    UpstreamTimeout { supplier: SupplierKind },

    #[error("{supplier} is unavailable: {message}")]
    UpstreamUnavailable { supplier: SupplierKind, message: String },

    #[error("unexpected response from {supplier}: {message}")]
    UpstreamProtocol { supplier: SupplierKind, message: String },

    #[error("cache error: {0}")]
    Cache(#[from] sea_orm::DbErr),

    #[error("cache encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classifies a transport fault raised while talking to `supplier`.
    pub fn upstream(supplier: SupplierKind, err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Self::UpstreamTimeout { supplier },
            TransportError::Connect(message) | TransportError::Other(message) => {
                Self::UpstreamUnavailable { supplier, message }
            },
            TransportError::Status { status, body } if (400..500).contains(&status) => {
                Self::UpstreamClient { supplier, status: Some(status), message: body }
            },
            TransportError::Status { status, body } => Self::UpstreamUnavailable {
                supplier,
                message: format!("HTTP {status}: {body}"),
            },
            TransportError::Decode(message) => Self::UpstreamProtocol { supplier, message },
        }
    }

    pub fn protocol(supplier: SupplierKind, message: impl Into<String>) -> Self {
        Self::UpstreamProtocol { supplier, message: message.into() }
    }

    /// Local storage faults, as opposed to anything a supplier or the caller
    /// got wrong.
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Cache(_) | AppError::Serialization(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamClient { status: Some(404), .. } => StatusCode::NOT_FOUND,
            AppError::UpstreamClient { .. } | AppError::UpstreamProtocol { .. } => {
                StatusCode::BAD_GATEWAY
            },
            AppError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Cache(_) | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
