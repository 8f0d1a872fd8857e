use std::any::Any;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::NormalizeError;
use crate::resolver::ResolveError;
use crate::upstream::UpstreamError;

// ============================================================================
// Bodies
// ============================================================================

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Body of every mutating operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn json(success: bool) -> Json<SuccessResponse> {
        Json(SuccessResponse { success })
    }
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    MalformedRequest(String),
    #[error("{0}")]
    UpstreamUnavailable(String),
    #[error("{0}")]
    UpstreamOperationFailed(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamUnavailable(_)
            | ApiError::UpstreamOperationFailed(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::info!(error = %self, "Request rejected");
        }
        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        ApiError::NotFound(e.to_string())
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Unavailable(_) | UpstreamError::Unauthorized(_) => {
                ApiError::UpstreamUnavailable(e.to_string())
            }
            UpstreamError::Rejected { .. } | UpstreamError::Malformed(_) => {
                ApiError::UpstreamOperationFailed(e.to_string())
            }
        }
    }
}

impl From<NormalizeError> for ApiError {
    fn from(e: NormalizeError) -> Self {
        ApiError::from(UpstreamError::from(e))
    }
}

/// Turn a handler panic into the regular 500 body.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let reason = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(reason, "Handler panicked");
    ApiError::Internal("Internal Server Error".into()).into_response()
}

// ============================================================================
// Custom extractors
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with an `ErrorBody`.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::MalformedRequest(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Path` that rejects with an `ErrorBody`.
pub struct AppPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(AppPath(value)),
            Err(PathRejection::FailedToDeserializePathParams(err)) => {
                Err(ApiError::MalformedRequest(err.body_text()))
            }
            Err(rejection) => Err(ApiError::Internal(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ClientRef;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::from(ResolveError::NotFound(ClientRef::Name("bob".into())));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Client 'bob' not found");
    }

    #[test]
    fn test_upstream_errors_map_to_500() {
        let cases = [
            UpstreamError::Unavailable("connection refused".into()),
            UpstreamError::Unauthorized("bad password".into()),
            UpstreamError::Rejected {
                action: "status".into(),
                status: 502,
                body: String::new(),
            },
            UpstreamError::Malformed("not json".into()),
        ];
        for case in cases {
            let err = ApiError::from(case);
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_upstream_message_is_preserved() {
        let err = ApiError::from(UpstreamError::Unavailable("connection refused".into()));
        assert!(matches!(err, ApiError::UpstreamUnavailable(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_malformed_request_maps_to_400() {
        let err = ApiError::MalformedRequest("Malformed JSON in request body".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_panic_response_is_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
