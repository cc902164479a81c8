use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::Error as DieselError;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DieselError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] diesel::r2d2::PoolError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Missing or empty x-user-id header")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::DatabaseError(_) | ApiError::PoolError(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

/// Maps diesel's `NotFound` to a 404 for `entity`, everything else to a 500.
pub fn or_not_found(entity: &'static str) -> impl Fn(DieselError) -> ApiError {
    move |err| match err {
        DieselError::NotFound => ApiError::NotFound(entity),
        other => ApiError::DatabaseError(other),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status();
        if status_code.is_server_error() {
            error!("{}", self);
        }
        (status_code, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::NotFound("task").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::invalid("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(DieselError::RollbackTransaction).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Internal("bad row".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_mapping() {
        let map = or_not_found("goal");
        assert!(matches!(map(DieselError::NotFound), ApiError::NotFound("goal")));
        assert!(matches!(
            map(DieselError::RollbackTransaction),
            ApiError::DatabaseError(_)
        ));
        assert_eq!(ApiError::NotFound("goal").to_string(), "goal not found");
    }
}
