use super::{check, read_json, request, ClientError};
pub use crate::api::subtasks::{
    CreateSubtaskRequest, ReorderSubtasksRequest, UpdateSubtaskRequest,
};
pub use crate::api::tasks::{
    CreateTaskRequest, InstantiateRequest, ListTasksParams, RolloverRequest, UpdateTaskRequest,
};
use crate::rollover::RolloverSummary;
use crate::tables::Task;
use crate::TASKS_API;
use chrono::NaiveDate;
use reqwest::Method;

// * Tasks ....................................................................

pub async fn create_task(
    base_url: &str,
    user: &str,
    task: CreateTaskRequest,
) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}");
    let response = request(Method::POST, url, user).json(&task).send().await?;
    read_json(response, "task").await
}

pub async fn fetch_task(base_url: &str, user: &str, id: i32) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{id}");
    let response = request(Method::GET, url, user).send().await?;
    read_json(response, &format!("task {id}")).await
}

pub async fn fetch_tasks(
    base_url: &str,
    user: &str,
    params: &ListTasksParams,
) -> Result<Vec<Task>, ClientError> {
    let url = format!("{base_url}/{TASKS_API}");
    let response = request(Method::GET, url, user).query(params).send().await?;
    read_json(response, "tasks").await
}

pub async fn update_task(
    base_url: &str,
    user: &str,
    id: i32,
    task: UpdateTaskRequest,
) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{id}");
    let response = request(Method::PUT, url, user).json(&task).send().await?;
    read_json(response, &format!("task {id}")).await
}

pub async fn delete_task(base_url: &str, user: &str, id: i32) -> Result<(), ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{id}");
    let response = request(Method::DELETE, url, user).send().await?;
    check(response, &format!("task {id}")).await?;
    Ok(())
}

pub async fn toggle_task(base_url: &str, user: &str, id: i32) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{id}/toggle");
    let response = request(Method::POST, url, user).send().await?;
    read_json(response, &format!("task {id}")).await
}

pub async fn save_task(base_url: &str, user: &str, id: i32) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{id}/save");
    let response = request(Method::POST, url, user).send().await?;
    read_json(response, &format!("task {id}")).await
}

pub async fn instantiate_task(
    base_url: &str,
    user: &str,
    id: i32,
    date: NaiveDate,
) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{id}/instantiate");
    let response = request(Method::POST, url, user)
        .json(&InstantiateRequest { date })
        .send()
        .await?;
    read_json(response, &format!("template {id}")).await
}

pub async fn rollover(
    base_url: &str,
    user: &str,
    date: Option<NaiveDate>,
) -> Result<RolloverSummary, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/rollover");
    let response = request(Method::POST, url, user)
        .json(&RolloverRequest { date })
        .send()
        .await?;
    read_json(response, "rollover").await
}

// * Subtasks .................................................................

pub async fn add_subtask(
    base_url: &str,
    user: &str,
    task_id: i32,
    title: &str,
) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{task_id}/subtasks");
    let response = request(Method::POST, url, user)
        .json(&CreateSubtaskRequest {
            title: title.to_string(),
        })
        .send()
        .await?;
    read_json(response, &format!("task {task_id}")).await
}

pub async fn update_subtask(
    base_url: &str,
    user: &str,
    task_id: i32,
    subtask_id: &str,
    changes: UpdateSubtaskRequest,
) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{task_id}/subtasks/{subtask_id}");
    let response = request(Method::PUT, url, user).json(&changes).send().await?;
    read_json(response, &format!("subtask {subtask_id}")).await
}

pub async fn delete_subtask(
    base_url: &str,
    user: &str,
    task_id: i32,
    subtask_id: &str,
) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{task_id}/subtasks/{subtask_id}");
    let response = request(Method::DELETE, url, user).send().await?;
    read_json(response, &format!("subtask {subtask_id}")).await
}

pub async fn reorder_subtasks(
    base_url: &str,
    user: &str,
    task_id: i32,
    ids: Vec<String>,
) -> Result<Task, ClientError> {
    let url = format!("{base_url}/{TASKS_API}/{task_id}/subtasks/order");
    let response = request(Method::PUT, url, user)
        .json(&ReorderSubtasksRequest { ids })
        .send()
        .await?;
    read_json(response, &format!("task {task_id}")).await
}
