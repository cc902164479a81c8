use super::error::ApiError;
use super::planner::range_end;
use super::user::CurrentUser;
use super::AppState;
use crate::stats::{summarize_days, RangeStats};
use crate::tables::Task;
use crate::tracker::{OperationStats, TRACKER};
use crate::{PLANNER_DAYS, STATS_API};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

const MAX_STATS_DAYS: i64 = 366;

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct StatsParams {
    /// Defaults to the Monday of the current week.
    pub start: Option<NaiveDate>,
    pub days: Option<i64>,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(format!("/{STATS_API}/week").as_str(), get(week_stats))
        .route(format!("/{STATS_API}/operations").as_str(), get(operation_stats))
}

pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

async fn week_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<StatsParams>,
) -> Result<Json<RangeStats>, ApiError> {
    let days = params.days.unwrap_or(PLANNER_DAYS);
    if !(1..=MAX_STATS_DAYS).contains(&days) {
        return Err(ApiError::invalid(format!(
            "days must be between 1 and {MAX_STATS_DAYS}"
        )));
    }
    let start = params
        .start
        .unwrap_or_else(|| week_start(Local::now().date_naive()));
    let end = range_end(start, days)?;

    let mut conn = state.pool.get()?;
    let tasks = Task::for_range(&mut conn, user.id(), start, end)?;
    TRACKER.record_reads(tasks.len().max(1));

    Ok(Json(summarize_days(&tasks, start, days)))
}

async fn operation_stats() -> Json<OperationStats> {
    Json(TRACKER.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_start_is_monday() {
        // 2024-07-04 is a Thursday
        let thursday = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(week_start(thursday), monday);
        assert_eq!(week_start(monday), monday);
        assert_eq!(
            week_start(NaiveDate::from_ymd_opt(2024, 7, 7).unwrap()),
            monday
        );
    }
}
