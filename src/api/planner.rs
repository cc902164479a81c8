use super::error::ApiError;
use super::titles::titles_in_range;
use super::user::CurrentUser;
use super::AppState;
use crate::ordering::{
    assign_orders, find_duplicate, move_item, sort_day_list, ItemKind, ItemRef, Ordered,
};
use crate::tables::{DayTitle, Section, Task};
use crate::time_input::minutes_of_day;
use crate::tracker::TRACKER;
use crate::{DAYS_API, PLANNER_API, PLANNER_DAYS};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::response::ErasedJson;
use chrono::{Duration, Local, NaiveDate, Timelike};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

// * Types ....................................................................

/// One entry of a day list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DayItem {
    Task(Task),
    Section(Section),
}

impl Ordered for DayItem {
    fn item_ref(&self) -> ItemRef {
        match self {
            DayItem::Task(t) => ItemRef::task(t.id),
            DayItem::Section(s) => ItemRef::section(s.id),
        }
    }

    fn order(&self) -> i32 {
        match self {
            DayItem::Task(t) => t.sort_order,
            DayItem::Section(s) => s.sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: NaiveDate,
    pub title: Option<String>,
    pub items: Vec<DayItem>,
    /// The task to highlight as "up next", only set for today.
    pub next_task_id: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct PlannerParams {
    pub start: Option<NaiveDate>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ReorderRequest {
    pub items: Vec<ItemRef>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub drag_index: usize,
    pub hover_index: usize,
}

// * Pure helpers .............................................................

/// Interleaves tasks and sections into one sorted day list.
pub fn merge_day(tasks: Vec<Task>, sections: Vec<Section>) -> Vec<DayItem> {
    let mut items: Vec<DayItem> = tasks
        .into_iter()
        .map(DayItem::Task)
        .chain(sections.into_iter().map(DayItem::Section))
        .collect();
    sort_day_list(&mut items);
    items
}

/// Picks the task to highlight: the earliest incomplete task scheduled at or
/// after `now_minutes`, otherwise the first incomplete task in list order.
pub fn next_task_id(items: &[DayItem], now_minutes: u32) -> Option<i32> {
    let open_tasks = || {
        items.iter().filter_map(|item| match item {
            DayItem::Task(t) if !t.completed => Some(t),
            _ => None,
        })
    };

    open_tasks()
        .filter_map(|t| {
            let minutes = minutes_of_day(t.scheduled_time.as_deref()?)?;
            (minutes >= now_minutes).then_some((minutes, t.id))
        })
        .min()
        .map(|(_, task_id)| task_id)
        .or_else(|| open_tasks().next().map(|t| t.id))
}

/// Last day of a `days`-long range starting at `start`.
pub(crate) fn range_end(start: NaiveDate, days: i64) -> Result<NaiveDate, ApiError> {
    start
        .checked_add_signed(Duration::days(days - 1))
        .ok_or_else(|| ApiError::invalid(format!("{days} days from {start} is out of range")))
}

/// Groups rows loaded for a date range into one view per day.
///
/// Days past the last representable date are left out.
pub fn build_days(
    start: NaiveDate,
    days: i64,
    tasks: Vec<Task>,
    sections: Vec<Section>,
    titles: Vec<DayTitle>,
) -> Vec<DayView> {
    (0..days)
        .map_while(|offset| start.checked_add_signed(Duration::days(offset)))
        .map(|day| {
            let day_tasks = tasks
                .iter()
                .filter(|t| t.date == Some(day) && !t.is_saved)
                .cloned()
                .collect();
            let day_sections = sections.iter().filter(|s| s.date == day).cloned().collect();
            DayView {
                date: day,
                title: titles
                    .iter()
                    .find(|t| t.date == day)
                    .map(|t| t.title.clone()),
                items: merge_day(day_tasks, day_sections),
                next_task_id: None,
            }
        })
        .collect()
}

fn mark_next_task(view: &mut DayView) {
    let now = Local::now();
    if view.date == now.date_naive() {
        view.next_task_id = next_task_id(&view.items, now.hour() * 60 + now.minute());
    }
}

// * Router ...................................................................

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(format!("/{DAYS_API}/:date").as_str(), get(get_day))
        .route(format!("/{DAYS_API}/:date/order").as_str(), put(reorder_day))
        .route(format!("/{DAYS_API}/:date/move").as_str(), post(move_day_item))
        .route(format!("/{PLANNER_API}").as_str(), get(get_planner))
}

fn load_range(
    conn: &mut PgConnection,
    owner: &str,
    start: NaiveDate,
    days: i64,
) -> Result<Vec<DayView>, ApiError> {
    let end = range_end(start, days)?;
    let tasks = Task::for_range(conn, owner, start, end)?;
    let sections = Section::for_range(conn, owner, start, end)?;
    let titles = titles_in_range(conn, owner, Some(start), Some(end))?;
    TRACKER.record_reads(tasks.len() + sections.len());

    let mut views = build_days(start, days, tasks, sections, titles);
    views.iter_mut().for_each(mark_next_task);
    Ok(views)
}

fn load_day(conn: &mut PgConnection, owner: &str, day: NaiveDate) -> Result<DayView, ApiError> {
    load_range(conn, owner, day, 1)?
        .pop()
        .ok_or(ApiError::NotFound("day"))
}

/// Writes `order = index` for each ref, all or nothing.
fn write_orders(
    conn: &mut PgConnection,
    owner: &str,
    day: NaiveDate,
    writes: &[(ItemRef, i32)],
) -> Result<(), ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| {
        let now = Local::now().naive_local();
        for &(item, new_order) in writes {
            let updated = match item.kind {
                ItemKind::Task => {
                    use crate::schema::tasks::dsl::*;
                    diesel::update(
                        tasks
                            .filter(id.eq(item.id))
                            .filter(user_id.eq(owner))
                            .filter(date.eq(day)),
                    )
                    .set((sort_order.eq(new_order), updated_at.eq(now)))
                    .execute(conn)?
                }
                ItemKind::Section => {
                    use crate::schema::sections::dsl::*;
                    diesel::update(
                        sections
                            .filter(id.eq(item.id))
                            .filter(user_id.eq(owner))
                            .filter(date.eq(day)),
                    )
                    .set((sort_order.eq(new_order), updated_at.eq(now)))
                    .execute(conn)?
                }
            };
            if updated == 0 {
                return Err(match item.kind {
                    ItemKind::Task => ApiError::NotFound("task"),
                    ItemKind::Section => ApiError::NotFound("section"),
                });
            }
        }
        TRACKER.record_writes(writes.len());
        Ok(())
    })
}

// * Handlers .................................................................

async fn get_day(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(day): Path<NaiveDate>,
) -> Result<Json<DayView>, ApiError> {
    let mut conn = state.pool.get()?;
    Ok(Json(load_day(&mut conn, user.id(), day)?))
}

async fn get_planner(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PlannerParams>,
) -> Result<ErasedJson, ApiError> {
    let start = params.start.unwrap_or_else(|| Local::now().date_naive());
    range_end(start, PLANNER_DAYS)?;
    let mut conn = state.pool.get()?;
    let views = load_range(&mut conn, user.id(), start, PLANNER_DAYS)?;
    Ok(ErasedJson::pretty(views))
}

async fn reorder_day(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(day): Path<NaiveDate>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<DayView>, ApiError> {
    if let Some(duplicate) = find_duplicate(&payload.items) {
        return Err(ApiError::invalid(format!(
            "{:?} {} listed more than once",
            duplicate.kind, duplicate.id
        )));
    }

    let writes: Vec<(ItemRef, i32)> = payload
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| (*item, index as i32))
        .collect();

    let mut conn = state.pool.get()?;
    write_orders(&mut conn, user.id(), day, &writes)?;
    debug!(user = %user.id(), "Reordered {} items on {}", writes.len(), day);

    Ok(Json(load_day(&mut conn, user.id(), day)?))
}

async fn move_day_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(day): Path<NaiveDate>,
    Json(payload): Json<MoveRequest>,
) -> Result<Json<DayView>, ApiError> {
    let mut conn = state.pool.get()?;
    let mut view = load_day(&mut conn, user.id(), day)?;

    if !move_item(&mut view.items, payload.drag_index, payload.hover_index) {
        return Err(ApiError::invalid(format!(
            "indices {} -> {} out of range for {} items",
            payload.drag_index,
            payload.hover_index,
            view.items.len()
        )));
    }

    let writes = assign_orders(&view.items);
    write_orders(&mut conn, user.id(), day, &writes)?;

    Ok(Json(load_day(&mut conn, user.id(), day)?))
}
