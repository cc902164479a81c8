use super::AppState;
use crate::auth::{auth_error_message, validate_credentials, AuthMode};
use crate::AUTH_API;
use axum::{extract::Path, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ValidateRequest {
    pub email: String,
    pub password: String,
    pub mode: AuthMode,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ValidateResponse {
    pub valid: bool,
    pub errors: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ErrorMessageResponse {
    pub code: String,
    pub message: String,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(format!("/{AUTH_API}/validate").as_str(), post(validate))
        .route(format!("/{AUTH_API}/errors/:code").as_str(), get(error_message))
}

async fn validate(Json(payload): Json<ValidateRequest>) -> Json<ValidateResponse> {
    let errors = validate_credentials(&payload.email, &payload.password, payload.mode);
    Json(ValidateResponse {
        valid: errors.is_empty(),
        errors,
    })
}

// Codes look like `auth/user-not-found`; the prefix is optional here.
async fn error_message(Path(code): Path<String>) -> Json<ErrorMessageResponse> {
    let full = if code.starts_with("auth/") {
        code
    } else {
        format!("auth/{code}")
    };
    Json(ErrorMessageResponse {
        message: auth_error_message(&full).to_string(),
        code: full,
    })
}
