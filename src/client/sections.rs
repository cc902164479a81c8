use super::{check, read_json, request, ClientError};
pub use crate::api::sections::{CreateSectionRequest, ListSectionsParams, UpdateSectionRequest};
use crate::tables::Section;
use crate::SECTIONS_API;
use reqwest::Method;

pub async fn create_section(
    base_url: &str,
    user: &str,
    section: CreateSectionRequest,
) -> Result<Section, ClientError> {
    let url = format!("{base_url}/{SECTIONS_API}");
    let response = request(Method::POST, url, user).json(&section).send().await?;
    read_json(response, "section").await
}

pub async fn fetch_sections(
    base_url: &str,
    user: &str,
    params: &ListSectionsParams,
) -> Result<Vec<Section>, ClientError> {
    let url = format!("{base_url}/{SECTIONS_API}");
    let response = request(Method::GET, url, user).query(params).send().await?;
    read_json(response, "sections").await
}

pub async fn update_section(
    base_url: &str,
    user: &str,
    id: i32,
    section: UpdateSectionRequest,
) -> Result<Section, ClientError> {
    let url = format!("{base_url}/{SECTIONS_API}/{id}");
    let response = request(Method::PUT, url, user).json(&section).send().await?;
    read_json(response, &format!("section {id}")).await
}

pub async fn delete_section(base_url: &str, user: &str, id: i32) -> Result<(), ClientError> {
    let url = format!("{base_url}/{SECTIONS_API}/{id}");
    let response = request(Method::DELETE, url, user).send().await?;
    check(response, &format!("section {id}")).await?;
    Ok(())
}
