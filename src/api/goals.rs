use super::error::{or_not_found, ApiError};
use super::tasks::clean_title;
use super::user::CurrentUser;
use super::AppState;
use crate::tables::{Goal, GoalChangeset, GoalStatus, NewGoal, ProgressType, Task};
use crate::tracker::TRACKER;
use crate::GOALS_API;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

// * Types ....................................................................

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub progress_type: ProgressType,
    #[serde(default)]
    pub total_steps: i32,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub progress_type: Option<ProgressType>,
    pub total_steps: Option<i32>,
    pub status: Option<GoalStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ProgressRequest {
    /// Percentage for percentage goals, current step for numerical goals.
    pub value: i32,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ListGoalsParams {
    pub status: Option<GoalStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GoalTasksResponse {
    pub goal_id: i32,
    pub total: usize,
    pub completed: usize,
    pub tasks: Vec<Task>,
}

/// New progress fields after recording `value` against a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub progress: i32,
    pub current_step: i32,
    pub status: GoalStatus,
}

/// Computes progress for a goal.
///
/// Percentage goals take `value` as the percentage (clamped to 0..=100) and
/// complete at 100. Numerical goals take `value` as the current step (clamped
/// to 0..=total_steps) and complete only once every step is done; until then
/// the derived percentage stays below 100. Dropping back reopens a completed
/// goal. Archived goals stay archived.
pub fn apply_progress(
    progress_type: ProgressType,
    total_steps: i32,
    status: GoalStatus,
    value: i32,
) -> Result<ProgressUpdate, ApiError> {
    let (progress, current_step, done) = match progress_type {
        ProgressType::Percentage => {
            let progress = value.clamp(0, 100);
            (progress, 0, progress >= 100)
        }
        ProgressType::Numerical => {
            if total_steps <= 0 {
                return Err(ApiError::invalid(
                    "numerical goals need a positive totalSteps",
                ));
            }
            let current = value.clamp(0, total_steps);
            if current >= total_steps {
                (100, current, true)
            } else {
                let percent = (current as f64 / total_steps as f64 * 100.0).round() as i32;
                (percent.min(99), current, false)
            }
        }
    };

    let status = match status {
        GoalStatus::Archived => GoalStatus::Archived,
        _ if done => GoalStatus::Completed,
        _ => GoalStatus::Active,
    };

    Ok(ProgressUpdate {
        progress,
        current_step,
        status,
    })
}

/// Progress after a goal's type, step count or status is edited.
///
/// The recorded amount is carried over: the current step for numerical
/// goals, the percentage for percentage goals.
pub fn revise_progress(
    goal: &Goal,
    progress_type: ProgressType,
    total_steps: i32,
    status: GoalStatus,
) -> Result<ProgressUpdate, ApiError> {
    let value = match progress_type {
        ProgressType::Percentage => goal.progress,
        ProgressType::Numerical => goal.current_step,
    };
    apply_progress(progress_type, total_steps, status, value)
}

fn stored_progress_type(goal: &Goal) -> Result<ProgressType, ApiError> {
    goal.progress_type
        .parse()
        .map_err(|e| {
            ApiError::Internal(format!("goal {} has a bad progress type: {e}", goal.id))
        })
}

fn stored_status(goal: &Goal) -> Result<GoalStatus, ApiError> {
    goal.status
        .parse()
        .map_err(|e| ApiError::Internal(format!("goal {} has a bad status: {e}", goal.id)))
}

// * Router ...................................................................

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{GOALS_API}").as_str(),
            get(list_goals).post(create_goal),
        )
        .route(
            format!("/{GOALS_API}/:id").as_str(),
            get(get_goal).put(update_goal).delete(delete_goal),
        )
        .route(
            format!("/{GOALS_API}/:id/progress").as_str(),
            put(update_progress),
        )
        .route(format!("/{GOALS_API}/:id/tasks").as_str(), get(goal_tasks))
}

fn load_goal(conn: &mut PgConnection, owner: &str, goal_id: i32) -> Result<Goal, ApiError> {
    use crate::schema::goals::dsl::*;

    let goal = goals
        .filter(id.eq(goal_id))
        .filter(user_id.eq(owner))
        .select(Goal::as_select())
        .first(conn)
        .map_err(or_not_found("goal"))?;
    TRACKER.record_reads(1);
    Ok(goal)
}

// * Handlers .................................................................

async fn list_goals(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListGoalsParams>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    use crate::schema::goals::dsl::*;

    let mut conn = state.pool.get()?;
    let mut query = goals
        .filter(user_id.eq(user.id()))
        .select(Goal::as_select())
        .into_boxed();
    if let Some(wanted) = params.status {
        query = query.filter(status.eq(wanted.as_str()));
    }
    let results = query.order(created_at.asc()).load(&mut conn)?;
    TRACKER.record_reads(results.len().max(1));

    Ok(Json(results))
}

async fn get_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
) -> Result<Json<Goal>, ApiError> {
    let mut conn = state.pool.get()?;
    Ok(Json(load_goal(&mut conn, user.id(), goal_id)?))
}

async fn create_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    use crate::schema::goals;

    let title = clean_title(&payload.title)?;
    if payload.progress_type == ProgressType::Numerical && payload.total_steps <= 0 {
        return Err(ApiError::invalid(
            "numerical goals need a positive totalSteps",
        ));
    }
    let now = Local::now().naive_local();

    let new_goal = NewGoal {
        user_id: user.id(),
        title: &title,
        description: payload.description.trim(),
        deadline: payload.deadline,
        progress: 0,
        progress_type: payload.progress_type.as_str(),
        current_step: 0,
        total_steps: payload.total_steps.max(0),
        status: GoalStatus::Active.as_str(),
        created_at: now,
        updated_at: now,
    };

    let mut conn = state.pool.get()?;
    let goal = diesel::insert_into(goals::table)
        .values(&new_goal)
        .returning(Goal::as_returning())
        .get_result::<Goal>(&mut conn)?;
    TRACKER.record_writes(1);
    info!(user = %user.id(), goal = goal.id, "Created goal");

    Ok((StatusCode::CREATED, Json(goal)))
}

async fn update_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
    Json(payload): Json<UpdateGoalRequest>,
) -> Result<Json<Goal>, ApiError> {
    use crate::schema::goals::dsl::*;

    let new_title = payload.title.as_deref().map(clean_title).transpose()?;
    if matches!(payload.total_steps, Some(steps) if steps < 0) {
        return Err(ApiError::invalid("totalSteps must not be negative"));
    }

    let mut conn = state.pool.get()?;
    let goal = load_goal(&mut conn, user.id(), goal_id)?;
    let new_type = match payload.progress_type {
        Some(t) => t,
        None => stored_progress_type(&goal)?,
    };
    let new_total = payload.total_steps.unwrap_or(goal.total_steps);
    let new_status = match payload.status {
        Some(s) => s,
        None => stored_status(&goal)?,
    };
    let update = revise_progress(&goal, new_type, new_total, new_status)?;

    let changes = GoalChangeset {
        title: new_title,
        description: payload.description,
        deadline: payload.deadline,
        progress: Some(update.progress),
        progress_type: Some(new_type.as_str().to_string()),
        current_step: Some(update.current_step),
        total_steps: Some(new_total),
        status: Some(update.status.as_str().to_string()),
        updated_at: Some(Local::now().naive_local()),
    };

    let goal = diesel::update(goals.find(goal.id))
        .set(&changes)
        .returning(Goal::as_returning())
        .get_result(&mut conn)?;
    TRACKER.record_writes(1);

    Ok(Json(goal))
}

async fn update_progress(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<Goal>, ApiError> {
    use crate::schema::goals::dsl::*;

    let mut conn = state.pool.get()?;
    let goal = load_goal(&mut conn, user.id(), goal_id)?;
    let update = apply_progress(
        stored_progress_type(&goal)?,
        goal.total_steps,
        stored_status(&goal)?,
        payload.value,
    )?;

    let goal = diesel::update(goals.find(goal.id))
        .set((
            progress.eq(update.progress),
            current_step.eq(update.current_step),
            status.eq(update.status.as_str()),
            updated_at.eq(Local::now().naive_local()),
        ))
        .returning(Goal::as_returning())
        .get_result(&mut conn)?;
    TRACKER.record_writes(1);

    Ok(Json(goal))
}

async fn delete_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    use crate::schema::goals::dsl::*;

    let mut conn = state.pool.get()?;
    // Tasks keep their goal ids; links to deleted goals are tolerated.
    let result = diesel::delete(goals.filter(id.eq(goal_id)).filter(user_id.eq(user.id())))
        .execute(&mut conn)?;
    TRACKER.record_writes(1);

    if result > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("goal"))
    }
}

async fn goal_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
) -> Result<Json<GoalTasksResponse>, ApiError> {
    use crate::schema::tasks::dsl::*;

    let mut conn = state.pool.get()?;
    let goal = load_goal(&mut conn, user.id(), goal_id)?;

    let linked = tasks
        .filter(user_id.eq(user.id()))
        .filter(is_saved.eq(false))
        .filter(goal_ids.contains(vec![goal.id]))
        .order((date.asc(), sort_order.asc()))
        .select(Task::as_select())
        .load(&mut conn)?;
    TRACKER.record_reads(linked.len().max(1));

    Ok(Json(GoalTasksResponse {
        goal_id: goal.id,
        total: linked.len(),
        completed: linked.iter().filter(|t| t.completed).count(),
        tasks: linked,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{setup_test_state, test_user};

    #[test]
    fn test_percentage_progress() {
        let update =
            apply_progress(ProgressType::Percentage, 0, GoalStatus::Active, 40).unwrap();
        assert_eq!(update.progress, 40);
        assert_eq!(update.status, GoalStatus::Active);

        let update =
            apply_progress(ProgressType::Percentage, 0, GoalStatus::Active, 150).unwrap();
        assert_eq!(update.progress, 100);
        assert_eq!(update.status, GoalStatus::Completed);
    }

    #[test]
    fn test_numerical_progress() {
        let update = apply_progress(ProgressType::Numerical, 3, GoalStatus::Active, 1).unwrap();
        assert_eq!(update.current_step, 1);
        assert_eq!(update.progress, 33);

        let update = apply_progress(ProgressType::Numerical, 3, GoalStatus::Active, 9).unwrap();
        assert_eq!(update.current_step, 3);
        assert_eq!(update.progress, 100);
        assert_eq!(update.status, GoalStatus::Completed);

        assert!(apply_progress(ProgressType::Numerical, 0, GoalStatus::Active, 1).is_err());
    }

    #[test]
    fn test_numerical_goal_needs_every_step() {
        let update =
            apply_progress(ProgressType::Numerical, 200, GoalStatus::Active, 199).unwrap();
        assert_eq!(update.current_step, 199);
        assert_eq!(update.progress, 99);
        assert_eq!(update.status, GoalStatus::Active);

        let update =
            apply_progress(ProgressType::Numerical, 200, GoalStatus::Active, 200).unwrap();
        assert_eq!(update.progress, 100);
        assert_eq!(update.status, GoalStatus::Completed);
    }

    fn stored_goal(progress_type: ProgressType, progress: i32, current: i32, total: i32) -> Goal {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Goal {
            id: 1,
            user_id: "u1".to_string(),
            title: "Run".to_string(),
            description: String::new(),
            deadline: None,
            progress,
            progress_type: progress_type.as_str().to_string(),
            current_step: current,
            total_steps: total,
            status: GoalStatus::Completed.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_raising_total_steps_reopens_goal() {
        let goal = stored_goal(ProgressType::Numerical, 100, 3, 3);
        let update =
            revise_progress(&goal, ProgressType::Numerical, 10, GoalStatus::Completed).unwrap();
        assert_eq!(update.current_step, 3);
        assert_eq!(update.progress, 30);
        assert_eq!(update.status, GoalStatus::Active);
    }

    #[test]
    fn test_switch_to_numerical_needs_steps() {
        let goal = stored_goal(ProgressType::Percentage, 40, 0, 0);
        assert!(matches!(
            revise_progress(&goal, ProgressType::Numerical, 0, GoalStatus::Active),
            Err(ApiError::Validation(_))
        ));

        let update =
            revise_progress(&goal, ProgressType::Numerical, 5, GoalStatus::Active).unwrap();
        assert_eq!(update.current_step, 0);
        assert_eq!(update.progress, 0);

        let back = stored_goal(ProgressType::Numerical, 60, 3, 5);
        let update =
            revise_progress(&back, ProgressType::Percentage, 5, GoalStatus::Active).unwrap();
        assert_eq!(update.progress, 60);
    }

    #[test]
    fn test_corrupt_stored_fields_are_internal_errors() {
        let mut goal = stored_goal(ProgressType::Percentage, 10, 0, 0);
        goal.status = "paused".to_string();
        let err = stored_status(&goal).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert!(err.status().is_server_error());

        goal.progress_type = "steps".to_string();
        assert!(matches!(stored_progress_type(&goal), Err(ApiError::Internal(_))));
    }

    #[test]
    fn test_status_transitions() {
        let reopened =
            apply_progress(ProgressType::Percentage, 0, GoalStatus::Completed, 80).unwrap();
        assert_eq!(reopened.status, GoalStatus::Active);

        let archived =
            apply_progress(ProgressType::Percentage, 0, GoalStatus::Archived, 100).unwrap();
        assert_eq!(archived.status, GoalStatus::Archived);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_goal_crud_and_progress() {
        let state = setup_test_state();
        let user = test_user();

        let (_, Json(goal)) = create_goal(
            State(state.clone()),
            user.clone(),
            Json(CreateGoalRequest {
                title: "Read 4 books".to_string(),
                description: String::new(),
                deadline: None,
                progress_type: ProgressType::Numerical,
                total_steps: 4,
            }),
        )
        .await
        .expect("Failed to create goal");
        assert_eq!(goal.status, "active");

        let Json(goal) = update_progress(
            State(state.clone()),
            user.clone(),
            Path(goal.id),
            Json(ProgressRequest { value: 2 }),
        )
        .await
        .expect("Failed to update progress");
        assert_eq!(goal.progress, 50);
        assert_eq!(goal.current_step, 2);

        let Json(goal) = update_goal(
            State(state.clone()),
            user.clone(),
            Path(goal.id),
            Json(UpdateGoalRequest {
                total_steps: Some(8),
                ..Default::default()
            }),
        )
        .await
        .expect("Failed to update goal");
        assert_eq!(goal.current_step, 2);
        assert_eq!(goal.progress, 25);
        assert_eq!(goal.status, "active");

        let rejected = update_goal(
            State(state.clone()),
            user.clone(),
            Path(goal.id),
            Json(UpdateGoalRequest {
                total_steps: Some(0),
                ..Default::default()
            }),
        )
        .await;
        assert!(matches!(rejected, Err(ApiError::Validation(_))));

        let Json(linked) = goal_tasks(State(state.clone()), user.clone(), Path(goal.id))
            .await
            .unwrap();
        assert_eq!(linked.total, 0);

        let deleted = delete_goal(State(state.clone()), user.clone(), Path(goal.id))
            .await
            .unwrap();
        assert_eq!(deleted, StatusCode::NO_CONTENT);
        assert!(matches!(
            get_goal(State(state), user, Path(goal.id)).await,
            Err(ApiError::NotFound("goal"))
        ));
    }
}
