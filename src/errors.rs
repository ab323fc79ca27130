use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream provider failure. `status` is the last HTTP status observed,
    /// or the synthetic timeout status for request timeouts. `retryable`
    /// records whether the failure class was in the retry allow-list (true
    /// means the attempt budget was exhausted).
    #[error("Unable to reach upstream provider ({status})")]
    Upstream { status: u16, retryable: bool },

    #[error("Credential signing failed: {0}")]
    Credential(String),

    /// A scoring rule references a field absent (or non-numeric without a
    /// translation table) in a forecast hour record.
    #[error("Forecast hour is missing scored field `{0}`")]
    MissingField(String),

    /// A raw value has no entry in its rule's translation table. Never
    /// silently scored as zero.
    #[error("No translation for value `{value}` of field `{field}`")]
    TranslationMissing { field: String, value: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Upstream { .. } => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Credential(err) => {
                tracing::error!("Credential error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Credential signing failed".to_string(),
                )
            }
            AppError::MissingField(_) | AppError::TranslationMissing { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::StoreUnavailable(err) => {
                tracing::error!("Store unavailable: {}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Persistent store unavailable".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_maps_to_503() {
        let resp = AppError::Upstream {
            status: 500,
            retryable: true,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_translation_missing_maps_to_422() {
        let resp = AppError::TranslationMissing {
            field: "conditionCode".to_string(),
            value: "Tornado".to_string(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let resp = AppError::NotFound("profile `nope` not found".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upstream_message_names_status() {
        let err = AppError::Upstream {
            status: 502,
            retryable: true,
        };
        assert!(err.to_string().contains("502"));
    }
}
