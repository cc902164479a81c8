use super::error::{or_not_found, ApiError};
use super::tasks::clean_title;
use super::user::CurrentUser;
use super::AppState;
use crate::tables::{Subtask, Subtasks, Task};
use crate::tracker::TRACKER;
use crate::TASKS_API;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use chrono::Local;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CreateSubtaskRequest {
    pub title: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct UpdateSubtaskRequest {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ReorderSubtasksRequest {
    pub ids: Vec<String>,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{TASKS_API}/:id/subtasks").as_str(),
            post(add_subtask),
        )
        .route(
            format!("/{TASKS_API}/:id/subtasks/order").as_str(),
            put(reorder_subtasks),
        )
        .route(
            format!("/{TASKS_API}/:id/subtasks/:subtask_id").as_str(),
            put(update_subtask).delete(delete_subtask),
        )
}

/// Puts the subtasks in the order given by `ids`.
///
/// `ids` must name every subtask exactly once.
pub fn reorder(subtasks: &mut Subtasks, ids: &[String]) -> Result<(), ApiError> {
    let known: HashSet<&str> = subtasks.0.iter().map(|s| s.id.as_str()).collect();
    let given: HashSet<&str> = ids.iter().map(String::as_str).collect();
    if ids.len() != subtasks.0.len() || given != known {
        return Err(ApiError::invalid(
            "subtask order must list every subtask exactly once",
        ));
    }

    for subtask in subtasks.0.iter_mut() {
        subtask.order = ids
            .iter()
            .position(|id| *id == subtask.id)
            .unwrap_or_default() as i32;
    }
    subtasks.normalize();
    Ok(())
}

/// Loads a task, applies `edit` to its subtasks, and writes them back.
fn edit_subtasks<F>(
    state: &AppState,
    owner: &str,
    task_id: i32,
    edit: F,
) -> Result<Task, ApiError>
where
    F: FnOnce(&mut Subtasks) -> Result<(), ApiError>,
{
    use crate::schema::tasks::dsl::*;

    let mut conn = state.pool.get()?;
    let task = Task::get_by_id(&mut conn, owner, task_id).map_err(or_not_found("task"))?;
    TRACKER.record_reads(1);

    let mut list = task.subtasks;
    edit(&mut list)?;

    let updated = diesel::update(tasks.find(task.id))
        .set((subtasks.eq(&list), updated_at.eq(Local::now().naive_local())))
        .returning(Task::as_returning())
        .get_result(&mut conn)?;
    TRACKER.record_writes(1);
    Ok(updated)
}

async fn add_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i32>,
    Json(payload): Json<CreateSubtaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let title = clean_title(&payload.title)?;
    let task = edit_subtasks(&state, user.id(), task_id, |list| {
        list.0.push(Subtask {
            id: Uuid::new_v4().to_string(),
            title,
            completed: false,
            order: list.0.len() as i32,
        });
        Ok(())
    })?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, subtask_id)): Path<(i32, String)>,
    Json(payload): Json<UpdateSubtaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let title = payload.title.as_deref().map(clean_title).transpose()?;
    let task = edit_subtasks(&state, user.id(), task_id, |list| {
        let subtask = list
            .find_mut(&subtask_id)
            .ok_or(ApiError::NotFound("subtask"))?;
        if let Some(title) = title {
            subtask.title = title;
        }
        if let Some(completed) = payload.completed {
            subtask.completed = completed;
        }
        Ok(())
    })?;
    Ok(Json(task))
}

async fn delete_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, subtask_id)): Path<(i32, String)>,
) -> Result<Json<Task>, ApiError> {
    let task = edit_subtasks(&state, user.id(), task_id, |list| {
        let before = list.0.len();
        list.0.retain(|s| s.id != subtask_id);
        if list.0.len() == before {
            return Err(ApiError::NotFound("subtask"));
        }
        list.normalize();
        Ok(())
    })?;
    Ok(Json(task))
}

async fn reorder_subtasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i32>,
    Json(payload): Json<ReorderSubtasksRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = edit_subtasks(&state, user.id(), task_id, |list| reorder(list, &payload.ids))?;
    Ok(Json(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> Subtasks {
        Subtasks(
            ids.iter()
                .enumerate()
                .map(|(i, id)| Subtask {
                    id: id.to_string(),
                    title: id.to_uppercase(),
                    completed: false,
                    order: i as i32,
                })
                .collect(),
        )
    }

    fn ids(list: &Subtasks) -> Vec<&str> {
        list.0.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_reorder_follows_given_ids() {
        let mut subtasks = list(&["a", "b", "c"]);
        reorder(
            &mut subtasks,
            &["c".to_string(), "a".to_string(), "b".to_string()],
        )
        .unwrap();
        assert_eq!(ids(&subtasks), vec!["c", "a", "b"]);
        assert_eq!(subtasks.0[2].order, 2);
    }

    #[test]
    fn test_reorder_rejects_partial_or_unknown_ids() {
        let mut subtasks = list(&["a", "b"]);
        assert!(reorder(&mut subtasks, &["a".to_string()]).is_err());
        assert!(reorder(&mut subtasks, &["a".to_string(), "z".to_string()]).is_err());
        assert!(reorder(&mut subtasks, &["a".to_string(), "a".to_string()]).is_err());
        assert_eq!(ids(&subtasks), vec!["a", "b"]);
    }
}
