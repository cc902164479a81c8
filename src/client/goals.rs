use super::{check, read_json, request, ClientError};
pub use crate::api::goals::{
    CreateGoalRequest, GoalTasksResponse, ListGoalsParams, ProgressRequest, UpdateGoalRequest,
};
use crate::tables::Goal;
use crate::GOALS_API;
use reqwest::Method;

pub async fn create_goal(
    base_url: &str,
    user: &str,
    goal: CreateGoalRequest,
) -> Result<Goal, ClientError> {
    let url = format!("{base_url}/{GOALS_API}");
    let response = request(Method::POST, url, user).json(&goal).send().await?;
    read_json(response, "goal").await
}

pub async fn fetch_goals(
    base_url: &str,
    user: &str,
    params: &ListGoalsParams,
) -> Result<Vec<Goal>, ClientError> {
    let url = format!("{base_url}/{GOALS_API}");
    let response = request(Method::GET, url, user).query(params).send().await?;
    read_json(response, "goals").await
}

pub async fn fetch_goal(base_url: &str, user: &str, id: i32) -> Result<Goal, ClientError> {
    let url = format!("{base_url}/{GOALS_API}/{id}");
    let response = request(Method::GET, url, user).send().await?;
    read_json(response, &format!("goal {id}")).await
}

pub async fn update_goal(
    base_url: &str,
    user: &str,
    id: i32,
    goal: UpdateGoalRequest,
) -> Result<Goal, ClientError> {
    let url = format!("{base_url}/{GOALS_API}/{id}");
    let response = request(Method::PUT, url, user).json(&goal).send().await?;
    read_json(response, &format!("goal {id}")).await
}

pub async fn set_goal_progress(
    base_url: &str,
    user: &str,
    id: i32,
    value: i32,
) -> Result<Goal, ClientError> {
    let url = format!("{base_url}/{GOALS_API}/{id}/progress");
    let response = request(Method::PUT, url, user)
        .json(&ProgressRequest { value })
        .send()
        .await?;
    read_json(response, &format!("goal {id}")).await
}

pub async fn fetch_goal_tasks(
    base_url: &str,
    user: &str,
    id: i32,
) -> Result<GoalTasksResponse, ClientError> {
    let url = format!("{base_url}/{GOALS_API}/{id}/tasks");
    let response = request(Method::GET, url, user).send().await?;
    read_json(response, &format!("goal {id}")).await
}

pub async fn delete_goal(base_url: &str, user: &str, id: i32) -> Result<(), ClientError> {
    let url = format!("{base_url}/{GOALS_API}/{id}");
    let response = request(Method::DELETE, url, user).send().await?;
    check(response, &format!("goal {id}")).await?;
    Ok(())
}
