use super::error::{or_not_found, ApiError};
use super::tasks::{clean_time, shift_day_orders};
use super::user::CurrentUser;
use super::AppState;
use crate::tables::{NewSection, Section, SectionChangeset};
use crate::tracker::TRACKER;
use crate::SECTIONS_API;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionRequest {
    pub text: String,
    pub time: String,
    pub date: NaiveDate,
    pub background_color: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionRequest {
    pub text: Option<String>,
    pub time: Option<String>,
    pub date: Option<NaiveDate>,
    pub order: Option<i32>,
    pub background_color: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ListSectionsParams {
    pub date: Option<NaiveDate>,
}

fn clean_text(text: &str) -> Result<String, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::invalid("section text must not be empty"));
    }
    Ok(text.to_string())
}

impl UpdateSectionRequest {
    pub fn into_changeset(self) -> Result<SectionChangeset, ApiError> {
        Ok(SectionChangeset {
            text: self.text.as_deref().map(clean_text).transpose()?,
            time: self.time.as_deref().map(clean_time).transpose()?,
            date: self.date,
            sort_order: self.order,
            background_color: self.background_color,
            updated_at: Some(Local::now().naive_local()),
        })
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{SECTIONS_API}").as_str(),
            get(list_sections).post(create_section),
        )
        .route(
            format!("/{SECTIONS_API}/:id").as_str(),
            get(get_section).put(update_section).delete(delete_section),
        )
}

async fn list_sections(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListSectionsParams>,
) -> Result<Json<Vec<Section>>, ApiError> {
    use crate::schema::sections::dsl::*;

    let mut conn = state.pool.get()?;
    let results = match params.date {
        Some(day) => Section::for_day(&mut conn, user.id(), day)?,
        None => sections
            .filter(user_id.eq(user.id()))
            .order((date.asc(), sort_order.asc(), id.asc()))
            .select(Section::as_select())
            .load(&mut conn)?,
    };
    TRACKER.record_reads(results.len().max(1));

    Ok(Json(results))
}

async fn get_section(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(section_id): Path<i32>,
) -> Result<Json<Section>, ApiError> {
    use crate::schema::sections::dsl::*;

    let mut conn = state.pool.get()?;
    let section = sections
        .filter(id.eq(section_id))
        .filter(user_id.eq(user.id()))
        .select(Section::as_select())
        .first(&mut conn)
        .map_err(or_not_found("section"))?;
    TRACKER.record_reads(1);

    Ok(Json(section))
}

async fn create_section(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateSectionRequest>,
) -> Result<(StatusCode, Json<Section>), ApiError> {
    use crate::schema::sections;

    let text = clean_text(&payload.text)?;
    let time = clean_time(&payload.time)?;
    let now = Local::now().naive_local();

    let new_section = NewSection {
        user_id: user.id(),
        text: &text,
        time: &time,
        date: payload.date,
        sort_order: 0,
        background_color: payload.background_color.as_deref(),
        created_at: now,
        updated_at: now,
    };

    let mut conn = state.pool.get()?;
    let section = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        shift_day_orders(conn, user.id(), payload.date)?;
        diesel::insert_into(sections::table)
            .values(&new_section)
            .returning(Section::as_returning())
            .get_result::<Section>(conn)
    })?;
    TRACKER.record_writes(1);
    info!(user = %user.id(), section = section.id, "Created section");

    Ok((StatusCode::CREATED, Json(section)))
}

async fn update_section(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(section_id): Path<i32>,
    Json(payload): Json<UpdateSectionRequest>,
) -> Result<Json<Section>, ApiError> {
    use crate::schema::sections::dsl::*;

    let changes = payload.into_changeset()?;
    let mut conn = state.pool.get()?;

    let section = diesel::update(
        sections
            .filter(id.eq(section_id))
            .filter(user_id.eq(user.id())),
    )
    .set(&changes)
    .returning(Section::as_returning())
    .get_result(&mut conn)
    .map_err(or_not_found("section"))?;
    TRACKER.record_writes(1);

    Ok(Json(section))
}

async fn delete_section(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(section_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    use crate::schema::sections::dsl::*;

    let mut conn = state.pool.get()?;
    let result = diesel::delete(
        sections
            .filter(id.eq(section_id))
            .filter(user_id.eq(user.id())),
    )
    .execute(&mut conn)?;
    TRACKER.record_writes(1);

    if result > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("section"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{setup_test_state, test_user};

    #[test]
    fn test_update_changeset_normalizes_time() {
        let changes = UpdateSectionRequest {
            time: Some("7".to_string()),
            text: Some(" Evening ".to_string()),
            ..Default::default()
        }
        .into_changeset()
        .unwrap();
        assert_eq!(changes.time.as_deref(), Some("07:00"));
        assert_eq!(changes.text.as_deref(), Some("Evening"));

        let blank = UpdateSectionRequest {
            text: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank.into_changeset().is_err());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_section_crud() {
        let state = setup_test_state();
        let user = test_user();
        let day = NaiveDate::from_ymd_opt(2030, 3, 4).unwrap();

        let (status, Json(section)) = create_section(
            State(state.clone()),
            user.clone(),
            Json(CreateSectionRequest {
                text: "Morning".to_string(),
                time: "0800".to_string(),
                date: day,
                background_color: None,
            }),
        )
        .await
        .expect("Failed to create section");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(section.time, "08:00");
        assert_eq!(section.sort_order, 0);

        let Json(updated) = update_section(
            State(state.clone()),
            user.clone(),
            Path(section.id),
            Json(UpdateSectionRequest {
                text: Some("Afternoon".to_string()),
                time: Some("1330".to_string()),
                ..Default::default()
            }),
        )
        .await
        .expect("Failed to update section");
        assert_eq!(updated.text, "Afternoon");
        assert_eq!(updated.time, "13:30");

        let Json(listed) = list_sections(
            State(state.clone()),
            user.clone(),
            Query(ListSectionsParams { date: Some(day) }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);

        let deleted = delete_section(State(state.clone()), user.clone(), Path(section.id))
            .await
            .unwrap();
        assert_eq!(deleted, StatusCode::NO_CONTENT);
        assert!(matches!(
            get_section(State(state), user, Path(section.id)).await,
            Err(ApiError::NotFound("section"))
        ));
    }
}
