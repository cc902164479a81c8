use super::error::{or_not_found, ApiError};
use super::user::CurrentUser;
use super::AppState;
use crate::tables::{DayTitle, UserTimestamp};
use crate::tracker::TRACKER;
use crate::{TIMESTAMPS_API, TITLES_API};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ListTitlesParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SetTitleRequest {
    pub title: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct SetTimestampRequest {
    /// Defaults to the current time.
    pub value: Option<NaiveDateTime>,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(format!("/{TITLES_API}").as_str(), get(list_titles))
        .route(
            format!("/{TITLES_API}/:date").as_str(),
            put(set_title).delete(delete_title),
        )
        .route(
            format!("/{TIMESTAMPS_API}/:name").as_str(),
            get(get_timestamp).put(set_timestamp),
        )
}

/// Titles of the days in `from..=to`; a missing bound is open.
pub(crate) fn titles_in_range(
    conn: &mut PgConnection,
    owner: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> QueryResult<Vec<DayTitle>> {
    use crate::schema::titles::dsl::*;

    let mut query = titles
        .filter(user_id.eq(owner))
        .select(DayTitle::as_select())
        .into_boxed();
    if let Some(from) = from {
        query = query.filter(date.ge(from));
    }
    if let Some(to) = to {
        query = query.filter(date.le(to));
    }

    let results = query.order(date.asc()).load(conn)?;
    TRACKER.record_reads(results.len().max(1));
    Ok(results)
}

async fn list_titles(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListTitlesParams>,
) -> Result<Json<Vec<DayTitle>>, ApiError> {
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(ApiError::invalid("`from` must not be after `to`"));
        }
    }

    let mut conn = state.pool.get()?;
    Ok(Json(titles_in_range(
        &mut conn,
        user.id(),
        params.from,
        params.to,
    )?))
}

async fn set_title(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(day): Path<NaiveDate>,
    Json(payload): Json<SetTitleRequest>,
) -> Result<Json<DayTitle>, ApiError> {
    use crate::schema::titles::dsl::*;

    let record = DayTitle {
        user_id: user.id().to_string(),
        date: day,
        title: payload.title.trim().to_string(),
        updated_at: Local::now().naive_local(),
    };

    let mut conn = state.pool.get()?;
    let saved = diesel::insert_into(titles)
        .values(&record)
        .on_conflict((user_id, date))
        .do_update()
        .set((title.eq(&record.title), updated_at.eq(record.updated_at)))
        .returning(DayTitle::as_returning())
        .get_result(&mut conn)?;
    TRACKER.record_writes(1);

    Ok(Json(saved))
}

async fn delete_title(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(day): Path<NaiveDate>,
) -> Result<StatusCode, ApiError> {
    use crate::schema::titles::dsl::*;

    let mut conn = state.pool.get()?;
    let result = diesel::delete(titles.filter(user_id.eq(user.id())).filter(date.eq(day)))
        .execute(&mut conn)?;
    TRACKER.record_writes(1);

    if result > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("title"))
    }
}

async fn get_timestamp(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(stamp_name): Path<String>,
) -> Result<Json<UserTimestamp>, ApiError> {
    use crate::schema::timestamps::dsl::*;

    let mut conn = state.pool.get()?;
    let stamp = timestamps
        .filter(user_id.eq(user.id()))
        .filter(name.eq(&stamp_name))
        .select(UserTimestamp::as_select())
        .first(&mut conn)
        .map_err(or_not_found("timestamp"))?;
    TRACKER.record_reads(1);

    Ok(Json(stamp))
}

async fn set_timestamp(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(stamp_name): Path<String>,
    Json(payload): Json<SetTimestampRequest>,
) -> Result<Json<UserTimestamp>, ApiError> {
    let stamp = UserTimestamp {
        user_id: user.id().to_string(),
        name: stamp_name,
        value: payload
            .value
            .unwrap_or_else(|| Local::now().naive_local()),
    };

    let mut conn = state.pool.get()?;
    UserTimestamp::upsert(&mut conn, &stamp)?;
    TRACKER.record_writes(1);

    Ok(Json(stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{setup_test_state, test_user};
    use crate::LAST_TASK_MOVE;

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_title_upsert_and_timestamps() {
        let state = setup_test_state();
        let user = test_user();
        let day = NaiveDate::from_ymd_opt(2030, 5, 6).unwrap();

        for text in ["Deep work", "Travel day"] {
            set_title(
                State(state.clone()),
                user.clone(),
                Path(day),
                Json(SetTitleRequest {
                    title: text.to_string(),
                }),
            )
            .await
            .expect("Failed to set title");
        }

        let Json(listed) = list_titles(
            State(state.clone()),
            user.clone(),
            Query(ListTitlesParams {
                from: Some(day),
                to: Some(day),
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Travel day");

        let when = day.and_hms_opt(0, 0, 30).unwrap();
        set_timestamp(
            State(state.clone()),
            user.clone(),
            Path(LAST_TASK_MOVE.to_string()),
            Json(SetTimestampRequest { value: Some(when) }),
        )
        .await
        .unwrap();
        let Json(stamp) = get_timestamp(
            State(state.clone()),
            user.clone(),
            Path(LAST_TASK_MOVE.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(stamp.value, when);

        delete_title(State(state), user, Path(day)).await.unwrap();
    }
}
