use super::error::{or_not_found, ApiError};
use super::user::CurrentUser;
use super::AppState;
use crate::rollover::{self, RolloverSummary};
use crate::tables::{NewTask, Subtask, Subtasks, Task, TaskChangeset};
use crate::time_input::format_time_from_input;
use crate::tracker::TRACKER;
use crate::TASKS_API;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

// * Types ....................................................................

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub goal_ids: Vec<i32>,
    pub background_color: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub order: Option<i32>,
    pub goal_ids: Option<Vec<i32>>,
    pub background_color: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ListTasksParams {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub saved: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct InstantiateRequest {
    pub date: NaiveDate,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct RolloverRequest {
    pub date: Option<NaiveDate>,
}

/// Trims a title and rejects it when nothing is left.
pub(crate) fn clean_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::invalid("title must not be empty"));
    }
    Ok(title.to_string())
}

/// Normalizes a free-text time to `HH:MM`.
pub(crate) fn clean_time(time: &str) -> Result<String, ApiError> {
    format_time_from_input(time)
        .ok_or_else(|| ApiError::invalid(format!("could not read a time from {time:?}")))
}

impl CreateTaskRequest {
    pub fn validated(mut self) -> Result<Self, ApiError> {
        self.title = clean_title(&self.title)?;
        self.scheduled_time = match self.scheduled_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(time) => Some(clean_time(time)?),
        };
        self.subtasks.retain(|s| !s.trim().is_empty());
        Ok(self)
    }
}

impl UpdateTaskRequest {
    pub fn into_changeset(self) -> Result<TaskChangeset, ApiError> {
        Ok(TaskChangeset {
            title: self.title.as_deref().map(clean_title).transpose()?,
            description: self.description,
            completed: self.completed,
            date: self.date,
            scheduled_time: self.scheduled_time.as_deref().map(clean_time).transpose()?,
            sort_order: self.order,
            subtasks: None,
            goal_ids: self.goal_ids,
            background_color: self.background_color,
            updated_at: Some(Local::now().naive_local()),
        })
    }
}

pub(crate) fn subtasks_from_titles(titles: &[String]) -> Subtasks {
    Subtasks(
        titles
            .iter()
            .enumerate()
            .map(|(index, title)| Subtask {
                id: Uuid::new_v4().to_string(),
                title: title.trim().to_string(),
                completed: false,
                order: index as i32,
            })
            .collect(),
    )
}

/// Copy of `subtasks` with every item reset to not completed.
fn reset_subtasks(subtasks: &Subtasks) -> Subtasks {
    Subtasks(
        subtasks
            .0
            .iter()
            .map(|s| Subtask {
                completed: false,
                ..s.clone()
            })
            .collect(),
    )
}

// * Router ...................................................................

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{TASKS_API}").as_str(),
            get(list_tasks).post(create_task),
        )
        .route(
            format!("/{TASKS_API}/rollover").as_str(),
            post(rollover_tasks),
        )
        .route(
            format!("/{TASKS_API}/:id").as_str(),
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            format!("/{TASKS_API}/:id/toggle").as_str(),
            post(toggle_task),
        )
        .route(
            format!("/{TASKS_API}/:id/save").as_str(),
            post(save_task_to_library),
        )
        .route(
            format!("/{TASKS_API}/:id/instantiate").as_str(),
            post(instantiate_template),
        )
}

// * Shared writes ............................................................

/// Pushes every task and section of `day` down by one slot.
pub(crate) fn shift_day_orders(
    conn: &mut PgConnection,
    owner: &str,
    day: NaiveDate,
) -> QueryResult<usize> {
    let shifted_tasks = {
        use crate::schema::tasks::dsl::*;
        diesel::update(tasks.filter(user_id.eq(owner)).filter(date.eq(day)))
            .set(sort_order.eq(sort_order + 1))
            .execute(conn)?
    };
    let shifted_sections = {
        use crate::schema::sections::dsl::*;
        diesel::update(sections.filter(user_id.eq(owner)).filter(date.eq(day)))
            .set(sort_order.eq(sort_order + 1))
            .execute(conn)?
    };
    TRACKER.record_writes(shifted_tasks + shifted_sections);
    Ok(shifted_tasks + shifted_sections)
}

/// Inserts a task at the top of its day: it takes order 0 and everything
/// already on that day moves down by one.
pub(crate) fn insert_task_at_top(conn: &mut PgConnection, new_task: &NewTask) -> QueryResult<Task> {
    use crate::schema::tasks;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        if let (Some(day), false) = (new_task.date, new_task.is_saved) {
            shift_day_orders(conn, new_task.user_id, day)?;
        }
        TRACKER.record_writes(1);
        diesel::insert_into(tasks::table)
            .values(new_task)
            .returning(Task::as_returning())
            .get_result(conn)
    })
}

// * Handlers .................................................................

async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListTasksParams>,
) -> Result<Json<Vec<Task>>, ApiError> {
    use crate::schema::tasks::dsl::*;

    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(ApiError::invalid("`from` must not be after `to`"));
        }
    }

    let mut conn = state.pool.get()?;

    let mut query = tasks
        .filter(user_id.eq(user.id()))
        .select(Task::as_select())
        .into_boxed();
    if let Some(day) = params.date {
        query = query.filter(date.eq(day));
    }
    if let Some(from) = params.from {
        query = query.filter(date.ge(from));
    }
    if let Some(to) = params.to {
        query = query.filter(date.le(to));
    }
    if let Some(saved) = params.saved {
        query = query.filter(is_saved.eq(saved));
    }

    let results = query
        .order((date.asc(), sort_order.asc(), id.asc()))
        .load(&mut conn)?;
    TRACKER.record_reads(results.len().max(1));

    Ok(Json(results))
}

async fn get_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i32>,
) -> Result<Json<Task>, ApiError> {
    let mut conn = state.pool.get()?;
    let task = Task::get_by_id(&mut conn, user.id(), task_id).map_err(or_not_found("task"))?;
    TRACKER.record_reads(1);
    Ok(Json(task))
}

async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let payload = payload.validated()?;
    let now = Local::now().naive_local();

    let new_task = NewTask {
        user_id: user.id(),
        title: &payload.title,
        description: &payload.description,
        completed: false,
        date: payload.date,
        scheduled_time: payload.scheduled_time.as_deref(),
        sort_order: 0,
        subtasks: subtasks_from_titles(&payload.subtasks),
        goal_ids: payload.goal_ids.clone(),
        background_color: payload.background_color.as_deref(),
        is_saved: false,
        created_at: now,
        updated_at: now,
    };

    let mut conn = state.pool.get()?;
    let task = insert_task_at_top(&mut conn, &new_task)?;
    info!(user = %user.id(), task = task.id, "Created task");

    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i32>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    use crate::schema::tasks::dsl::*;

    let changes = payload.into_changeset()?;
    let mut conn = state.pool.get()?;

    let task = diesel::update(tasks.filter(id.eq(task_id)).filter(user_id.eq(user.id())))
        .set(&changes)
        .returning(Task::as_returning())
        .get_result(&mut conn)
        .map_err(or_not_found("task"))?;
    TRACKER.record_writes(1);

    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    use crate::schema::tasks::dsl::*;

    let mut conn = state.pool.get()?;

    let result = diesel::delete(tasks.filter(id.eq(task_id)).filter(user_id.eq(user.id())))
        .execute(&mut conn)?;
    TRACKER.record_writes(1);

    if result > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("task"))
    }
}

async fn toggle_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i32>,
) -> Result<Json<Task>, ApiError> {
    use crate::schema::tasks::dsl::*;

    let mut conn = state.pool.get()?;
    let current = Task::get_by_id(&mut conn, user.id(), task_id).map_err(or_not_found("task"))?;

    let task = diesel::update(tasks.find(current.id))
        .set((
            completed.eq(!current.completed),
            updated_at.eq(Local::now().naive_local()),
        ))
        .returning(Task::as_returning())
        .get_result(&mut conn)?;
    TRACKER.record_reads(1);
    TRACKER.record_writes(1);

    Ok(Json(task))
}

async fn save_task_to_library(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i32>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let mut conn = state.pool.get()?;
    let source = Task::get_by_id(&mut conn, user.id(), task_id).map_err(or_not_found("task"))?;
    TRACKER.record_reads(1);

    let now = Local::now().naive_local();
    let template = NewTask {
        user_id: user.id(),
        title: &source.title,
        description: &source.description,
        completed: false,
        date: None,
        scheduled_time: source.scheduled_time.as_deref(),
        sort_order: 0,
        subtasks: reset_subtasks(&source.subtasks),
        goal_ids: source.goal_ids.clone(),
        background_color: source.background_color.as_deref(),
        is_saved: true,
        created_at: now,
        updated_at: now,
    };

    let saved = insert_task_at_top(&mut conn, &template)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn instantiate_template(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(template_id): Path<i32>,
    Json(payload): Json<InstantiateRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let mut conn = state.pool.get()?;
    let template =
        Task::get_by_id(&mut conn, user.id(), template_id).map_err(or_not_found("task"))?;
    TRACKER.record_reads(1);

    if !template.is_saved {
        return Err(ApiError::invalid("task is not a library template"));
    }

    let now = Local::now().naive_local();
    let copy = NewTask {
        user_id: user.id(),
        title: &template.title,
        description: &template.description,
        completed: false,
        date: Some(payload.date),
        scheduled_time: template.scheduled_time.as_deref(),
        sort_order: 0,
        subtasks: reset_subtasks(&template.subtasks),
        goal_ids: template.goal_ids.clone(),
        background_color: template.background_color.as_deref(),
        is_saved: false,
        created_at: now,
        updated_at: now,
    };

    let task = insert_task_at_top(&mut conn, &copy)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn rollover_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Option<Json<RolloverRequest>>,
) -> Result<Json<RolloverSummary>, ApiError> {
    let now = Local::now().naive_local();
    let day = payload
        .and_then(|Json(request)| request.date)
        .unwrap_or_else(|| now.date());
    if day.succ_opt().is_none() {
        return Err(ApiError::invalid(format!("{day} has no following day")));
    }

    let mut conn = state.pool.get()?;
    let summary = rollover::move_incomplete_tasks_to_next_day(&mut conn, user.id(), day, now)?;
    info!(
        user = %user.id(),
        moved = summary.moved_tasks,
        deleted = summary.deleted_tasks,
        "Manual rollover of {}",
        day
    );

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{setup_test_state, test_user};

    #[test]
    fn test_create_request_validation() {
        let request = CreateTaskRequest {
            title: "  Buy milk ".to_string(),
            scheduled_time: Some("930".to_string()),
            subtasks: vec!["".to_string(), "Oat".to_string()],
            ..Default::default()
        }
        .validated()
        .expect("valid request");

        assert_eq!(request.title, "Buy milk");
        assert_eq!(request.scheduled_time.as_deref(), Some("09:30"));
        assert_eq!(request.subtasks, vec!["Oat".to_string()]);

        let blank_time = CreateTaskRequest {
            title: "x".to_string(),
            scheduled_time: Some("  ".to_string()),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(blank_time.scheduled_time, None);

        let empty = CreateTaskRequest {
            title: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(empty.validated(), Err(ApiError::Validation(_))));

        let bad_time = CreateTaskRequest {
            title: "x".to_string(),
            scheduled_time: Some("noon".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_time.validated(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_update_request_changeset() {
        let changes = UpdateTaskRequest {
            scheduled_time: Some("25".to_string()),
            order: Some(4),
            ..Default::default()
        }
        .into_changeset()
        .unwrap();

        assert_eq!(changes.scheduled_time.as_deref(), Some("23:00"));
        assert_eq!(changes.sort_order, Some(4));
        assert!(changes.title.is_none());
        assert!(changes.updated_at.is_some());
    }

    #[test]
    fn test_subtasks_from_titles_orders_and_ids() {
        let subtasks = subtasks_from_titles(&["a".to_string(), " b ".to_string()]);
        assert_eq!(subtasks.0.len(), 2);
        assert_eq!(subtasks.0[1].title, "b");
        assert_eq!(subtasks.0[1].order, 1);
        assert_ne!(subtasks.0[0].id, subtasks.0[1].id);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_puts_task_first_and_shifts_day() {
        let state = setup_test_state();
        let user = test_user();
        let day = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();

        let create = |title: &str| CreateTaskRequest {
            title: title.to_string(),
            date: Some(day),
            ..Default::default()
        };

        let (_, Json(first)) =
            create_task(State(state.clone()), user.clone(), Json(create("first")))
                .await
                .expect("Failed to create task");
        let (_, Json(second)) =
            create_task(State(state.clone()), user.clone(), Json(create("second")))
                .await
                .expect("Failed to create task");
        assert_eq!(second.sort_order, 0);

        let Json(first) = get_task(State(state.clone()), user.clone(), Path(first.id))
            .await
            .expect("Failed to get task");
        assert_eq!(first.sort_order, 1);

        let delete_response = delete_task(State(state.clone()), user.clone(), Path(first.id))
            .await
            .expect("Failed to delete task");
        assert_eq!(delete_response, StatusCode::NO_CONTENT);
        delete_task(State(state.clone()), user.clone(), Path(second.id))
            .await
            .expect("Failed to delete task");

        let get_result = get_task(State(state), user, Path(first.id)).await;
        assert!(matches!(get_result, Err(ApiError::NotFound("task"))));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_rollover_moves_incomplete_and_deletes_completed() {
        let state = setup_test_state();
        let user = test_user();
        let today = NaiveDate::from_ymd_opt(2030, 2, 1).unwrap();
        let tomorrow = today.succ_opt().unwrap();

        let (_, Json(open)) = create_task(
            State(state.clone()),
            user.clone(),
            Json(CreateTaskRequest {
                title: "open".to_string(),
                date: Some(today),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        let (_, Json(done)) = create_task(
            State(state.clone()),
            user.clone(),
            Json(CreateTaskRequest {
                title: "done".to_string(),
                date: Some(today),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        toggle_task(State(state.clone()), user.clone(), Path(done.id))
            .await
            .unwrap();

        let Json(summary) = rollover_tasks(
            State(state.clone()),
            user.clone(),
            Some(Json(RolloverRequest { date: Some(today) })),
        )
        .await
        .unwrap();
        assert_eq!(summary.target_date, tomorrow);
        assert_eq!(summary.moved_tasks, 1);
        assert_eq!(summary.deleted_tasks, 1);

        let Json(moved) = get_task(State(state.clone()), user.clone(), Path(open.id))
            .await
            .unwrap();
        assert_eq!(moved.date, Some(tomorrow));
        assert!(matches!(
            get_task(State(state.clone()), user.clone(), Path(done.id)).await,
            Err(ApiError::NotFound(_))
        ));

        delete_task(State(state), user, Path(open.id)).await.unwrap();
    }
}
