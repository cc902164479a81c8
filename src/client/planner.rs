use super::{check, read_json, request, ClientError};
pub use crate::api::planner::{DayItem, DayView, MoveRequest, PlannerParams, ReorderRequest};
pub use crate::api::titles::{ListTitlesParams, SetTimestampRequest, SetTitleRequest};
use crate::ordering::ItemRef;
use crate::tables::{DayTitle, UserTimestamp};
use crate::{DAYS_API, PLANNER_API, TIMESTAMPS_API, TITLES_API};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use futures::future::join_all;
use reqwest::Method;

// * Days .....................................................................

pub async fn fetch_day(
    base_url: &str,
    user: &str,
    date: NaiveDate,
) -> Result<DayView, ClientError> {
    let url = format!("{base_url}/{DAYS_API}/{date}");
    let response = request(Method::GET, url, user).send().await?;
    read_json(response, &format!("day {date}")).await
}

/// The seven-day planner starting at `start` (today when `None`).
pub async fn fetch_planner(
    base_url: &str,
    user: &str,
    start: Option<NaiveDate>,
) -> Result<Vec<DayView>, ClientError> {
    let url = format!("{base_url}/{PLANNER_API}");
    let response = request(Method::GET, url, user)
        .query(&PlannerParams { start })
        .send()
        .await?;
    read_json(response, "planner").await
}

/// Fetches `days` single days concurrently.
pub async fn fetch_days(
    base_url: &str,
    user: &str,
    start: NaiveDate,
    days: i64,
) -> Result<Vec<DayView>, ClientError> {
    let requests = (0..days)
        .map_while(|offset| start.checked_add_signed(Duration::days(offset)))
        .map(|date| fetch_day(base_url, user, date));
    join_all(requests).await.into_iter().collect()
}

pub async fn reorder_day(
    base_url: &str,
    user: &str,
    date: NaiveDate,
    items: Vec<ItemRef>,
) -> Result<DayView, ClientError> {
    let url = format!("{base_url}/{DAYS_API}/{date}/order");
    let response = request(Method::PUT, url, user)
        .json(&ReorderRequest { items })
        .send()
        .await?;
    read_json(response, &format!("day {date}")).await
}

pub async fn move_day_item(
    base_url: &str,
    user: &str,
    date: NaiveDate,
    drag_index: usize,
    hover_index: usize,
) -> Result<DayView, ClientError> {
    let url = format!("{base_url}/{DAYS_API}/{date}/move");
    let response = request(Method::POST, url, user)
        .json(&MoveRequest {
            drag_index,
            hover_index,
        })
        .send()
        .await?;
    read_json(response, &format!("day {date}")).await
}

// * Titles and timestamps ....................................................

pub async fn fetch_titles(
    base_url: &str,
    user: &str,
    params: &ListTitlesParams,
) -> Result<Vec<DayTitle>, ClientError> {
    let url = format!("{base_url}/{TITLES_API}");
    let response = request(Method::GET, url, user).query(params).send().await?;
    read_json(response, "titles").await
}

pub async fn set_title(
    base_url: &str,
    user: &str,
    date: NaiveDate,
    title: &str,
) -> Result<DayTitle, ClientError> {
    let url = format!("{base_url}/{TITLES_API}/{date}");
    let response = request(Method::PUT, url, user)
        .json(&SetTitleRequest {
            title: title.to_string(),
        })
        .send()
        .await?;
    read_json(response, &format!("title {date}")).await
}

pub async fn delete_title(base_url: &str, user: &str, date: NaiveDate) -> Result<(), ClientError> {
    let url = format!("{base_url}/{TITLES_API}/{date}");
    let response = request(Method::DELETE, url, user).send().await?;
    check(response, &format!("title {date}")).await?;
    Ok(())
}

pub async fn fetch_timestamp(
    base_url: &str,
    user: &str,
    name: &str,
) -> Result<UserTimestamp, ClientError> {
    let url = format!("{base_url}/{TIMESTAMPS_API}/{name}");
    let response = request(Method::GET, url, user).send().await?;
    read_json(response, &format!("timestamp {name}")).await
}

pub async fn set_timestamp(
    base_url: &str,
    user: &str,
    name: &str,
    value: Option<NaiveDateTime>,
) -> Result<UserTimestamp, ClientError> {
    let url = format!("{base_url}/{TIMESTAMPS_API}/{name}");
    let response = request(Method::PUT, url, user)
        .json(&SetTimestampRequest { value })
        .send()
        .await?;
    read_json(response, &format!("timestamp {name}")).await
}
