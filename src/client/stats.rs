use super::{read_json, request, ClientError};
pub use crate::api::auth::{ErrorMessageResponse, ValidateRequest, ValidateResponse};
pub use crate::api::stats::StatsParams;
pub use crate::api::HealthResponse;
use crate::auth::AuthMode;
use crate::stats::RangeStats;
use crate::tracker::OperationStats;
use crate::{AUTH_API, STATS_API};
use chrono::NaiveDate;
use reqwest::Method;

pub async fn fetch_week_stats(
    base_url: &str,
    user: &str,
    start: Option<NaiveDate>,
    days: Option<i64>,
) -> Result<RangeStats, ClientError> {
    let url = format!("{base_url}/{STATS_API}/week");
    let response = request(Method::GET, url, user)
        .query(&StatsParams { start, days })
        .send()
        .await?;
    read_json(response, "stats").await
}

pub async fn fetch_operation_stats(base_url: &str) -> Result<OperationStats, ClientError> {
    let response = reqwest::get(format!("{base_url}/{STATS_API}/operations")).await?;
    read_json(response, "stats").await
}

pub async fn validate_credentials(
    base_url: &str,
    email: &str,
    password: &str,
    mode: AuthMode,
) -> Result<ValidateResponse, ClientError> {
    let response = reqwest::Client::new()
        .post(format!("{base_url}/{AUTH_API}/validate"))
        .json(&ValidateRequest {
            email: email.to_string(),
            password: password.to_string(),
            mode,
        })
        .send()
        .await?;
    read_json(response, "auth").await
}

pub async fn fetch_health(base_url: &str) -> Result<HealthResponse, ClientError> {
    let response = reqwest::get(format!("{base_url}/health")).await?;
    read_json(response, "health").await
}
