use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::state_machine::InvalidTransition;
use serde::Serialize;
use thiserror::Error;

/// HTTP-facing error taxonomy.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Field-level validation failure, carrying the per-field detail that
    /// `ErrorBody.details` renders alongside the summary `message`.
    #[error("Validation error: {0}")]
    ValidationDetailed(String, Vec<ValidationDetail>),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Rate limited")]
    RateLimited,

    /// A dependency (store, geo index) is unavailable — 502.
    #[error("Dependency failure: {0}")]
    DependencyFailure(String),

    /// The request was well-formed but cannot be carried out — 422. Used
    /// for payment creation once a trip's retry budget is exhausted.
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<InvalidTransitionDetail>,
}

#[derive(Debug, Serialize)]
struct InvalidTransitionDetail {
    entity: String,
    from: String,
    to: String,
    allowed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut transition = None;
        let mut details = None;

        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::ValidationDetailed(msg, field_errors) => {
                details = Some(
                    field_errors
                        .iter()
                        .map(|d| ValidationDetail {
                            field: d.field.clone(),
                            message: d.message.clone(),
                        })
                        .collect(),
                );
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            ApiError::InvalidTransition(t) => {
                transition = Some(InvalidTransitionDetail {
                    entity: t.entity.to_string(),
                    from: t.from.clone(),
                    to: t.to.clone(),
                    allowed: t.allowed.clone(),
                });
                (StatusCode::CONFLICT, "invalid_transition", t.to_string())
            }
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests. Please try again later.".into(),
            ),
            ApiError::DependencyFailure(msg) => {
                tracing::error!("Dependency failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "dependency_failure", msg.clone())
            }
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
            transition,
        };

        (status, Json(body)).into_response()
    }
}

impl From<persistence::error::RepoError> for ApiError {
    fn from(err: persistence::error::RepoError) -> Self {
        use persistence::error::RepoError;
        match err {
            RepoError::Db(e) => ApiError::from(e),
            RepoError::InvalidTransition(t) => ApiError::InvalidTransition(t),
            RepoError::NotFound { entity, id } => ApiError::NotFound(format!("{entity} {id} not found")),
            RepoError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                ApiError::DependencyFailure(format!("store unavailable: {}", err))
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();

        let message = if details.len() == 1 {
            details[0].message.clone()
        } else {
            format!("{} validation errors", details.len())
        };

        ApiError::ValidationDetailed(message, details)
    }
}
