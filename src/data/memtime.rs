//! Memtime REST API client
//!
//! Issues authenticated HTTP calls against the four API resources (clients,
//! projects, tasks, time entries) and normalizes list responses into
//! [`Page`]s.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::page::PageBody;
use super::{Client, EntityId, Page, PageRequest, Project, Task, TaskOption, TimeEntry, TimeEntryInput};

/// Base URL of the hosted Memtime demo API
pub const DEFAULT_BASE_URL: &str = "https://interview-api.memtime-demo.deno.net/api/v1";

/// Page size used when walking the whole hierarchy for the task picker
const ALL_TASKS_PAGE_SIZE: u64 = 100;

/// Errors that can occur when talking to the Memtime API
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer credential was configured
    #[error("MEMTIME_API_KEY environment variable is not set")]
    MissingApiKey,

    /// The request never produced a response
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape
    #[error("Failed to parse API response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status code, when the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Extracts a human-readable message from an error response body
///
/// Prefers the JSON `message` field, then the JSON `error` field, then the
/// raw body text, and finally falls back to `API Error: <status>`.
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(text) = json.get(field).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    // A JSON document without a usable field is not a message either
    let is_json = serde_json::from_str::<serde_json::Value>(trimmed).is_ok();
    if !trimmed.is_empty() && !is_json {
        return trimmed.to_string();
    }

    format!("API Error: {}", status)
}

/// Client for the Memtime time-tracking API
#[derive(Debug, Clone)]
pub struct MemtimeClient {
    /// HTTP client for making requests
    http_client: HttpClient,
    /// Base URL without trailing slash
    base_url: String,
    /// Bearer credential
    api_key: String,
}

impl MemtimeClient {
    /// Creates a client for `base_url` authenticated with `api_key`
    ///
    /// # Returns
    /// * `Err(ApiError::MissingApiKey)` if the key is empty
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http_client: HttpClient::new(),
            base_url,
            api_key,
        })
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an API path such as `/clients?limit=10`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "api request");
        self.http_client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
    }

    /// Lists clients
    pub async fn list_clients(&self, page: PageRequest) -> Result<Page<Client>, ApiError> {
        self.get_page(&page.apply_to("/clients"), page).await
    }

    /// Lists the projects of a client
    pub async fn list_projects(
        &self,
        client_id: EntityId,
        page: PageRequest,
    ) -> Result<Page<Project>, ApiError> {
        let path = format!("/clients/{}/projects", client_id);
        self.get_page(&page.apply_to(&path), page).await
    }

    /// Lists the tasks of a project
    pub async fn list_tasks(
        &self,
        project_id: EntityId,
        page: PageRequest,
    ) -> Result<Page<Task>, ApiError> {
        let path = format!("/projects/{}/tasks", project_id);
        self.get_page(&page.apply_to(&path), page).await
    }

    /// Lists time entries
    pub async fn list_time_entries(&self, page: PageRequest) -> Result<Page<TimeEntry>, ApiError> {
        self.get_page(&page.apply_to("/time-entries"), page).await
    }

    /// Fetches a single time entry
    pub async fn get_time_entry(&self, id: EntityId) -> Result<TimeEntry, ApiError> {
        let response = self
            .request(Method::GET, &format!("/time-entries/{}", id))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Creates a time entry
    pub async fn create_time_entry(&self, input: &TimeEntryInput) -> Result<TimeEntry, ApiError> {
        let response = self
            .request(Method::POST, "/time-entries")
            .json(input)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Replaces the fields of an existing time entry
    pub async fn update_time_entry(
        &self,
        id: EntityId,
        input: &TimeEntryInput,
    ) -> Result<TimeEntry, ApiError> {
        let response = self
            .request(Method::PUT, &format!("/time-entries/{}", id))
            .json(input)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Walks clients, projects and tasks to build the task picker options
    ///
    /// Projects of all clients are requested concurrently, then tasks of all
    /// projects. Any failing request fails the whole walk.
    pub async fn all_tasks(&self) -> Result<Vec<TaskOption>, ApiError> {
        let window = PageRequest::first(ALL_TASKS_PAGE_SIZE);
        let clients = self.list_clients(window).await?.data;

        let project_pages = futures::future::try_join_all(
            clients.iter().map(|client| self.list_projects(client.id, window)),
        )
        .await?;

        let projects: Vec<(&Client, Project)> = clients
            .iter()
            .zip(project_pages)
            .flat_map(|(client, page)| page.data.into_iter().map(move |p| (client, p)))
            .collect();

        let task_pages = futures::future::try_join_all(
            projects
                .iter()
                .map(|(_, project)| self.list_tasks(project.id, window)),
        )
        .await?;

        let options = projects
            .iter()
            .zip(task_pages)
            .flat_map(|((client, project), page)| {
                page.data.into_iter().map(move |task| TaskOption {
                    task,
                    project_name: project.name.clone(),
                    client_name: client.name.clone(),
                })
            })
            .collect();

        Ok(options)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: PageRequest,
    ) -> Result<Page<T>, ApiError> {
        let response = self.request(Method::GET, path).send().await?;
        let body: PageBody<T> = handle_response(response).await?;
        let page = body.normalize(page);
        debug!(path, count = page.count(), total = page.total, "page received");
        Ok(page)
    }
}

/// Turns a response into a value, or into an [`ApiError`] for non-success statuses
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;
    parse_body(status, &text)
}

fn parse_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, ApiError> {
    if !status.is_success() {
        let message = extract_error_message(status.as_u16(), text);
        warn!(status = status.as_u16(), %message, "api error");
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_is_preferred() {
        let body = r#"{"message": "Task not found", "error": "Not Found"}"#;
        assert_eq!(extract_error_message(404, body), "Task not found");
    }

    #[test]
    fn test_error_field_used_without_message() {
        let body = r#"{"error": "Unauthorized"}"#;
        assert_eq!(extract_error_message(401, body), "Unauthorized");
    }

    #[test]
    fn test_raw_text_used_for_non_json_body() {
        assert_eq!(
            extract_error_message(502, "Bad gateway upstream\n"),
            "Bad gateway upstream"
        );
    }

    #[test]
    fn test_empty_body_falls_back_to_status() {
        assert_eq!(extract_error_message(500, ""), "API Error: 500");
        assert_eq!(extract_error_message(503, "   "), "API Error: 503");
    }

    #[test]
    fn test_json_without_message_falls_back_to_status() {
        assert_eq!(extract_error_message(400, r#"{"code": 17}"#), "API Error: 400");
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let result = MemtimeClient::new(DEFAULT_BASE_URL, "  ");
        assert!(matches!(result, Err(ApiError::MissingApiKey)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = MemtimeClient::new("http://localhost:8000/api/v1/", "key").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(
            client.url("/clients?limit=10"),
            "http://localhost:8000/api/v1/clients?limit=10"
        );
    }

    #[test]
    fn test_parse_body_maps_error_status() {
        let result: Result<TimeEntry, ApiError> =
            parse_body(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message": "end before start"}"#);

        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.to_string(), "end before start");
    }

    #[test]
    fn test_parse_body_decodes_success() {
        let result: Result<PageBody<Client>, ApiError> = parse_body(
            StatusCode::OK,
            r#"[{"id": 1, "name": "Acme"}, {"id": 2, "name": "Globex"}]"#,
        );

        let page = result.unwrap().normalize(PageRequest::new(2, 0));
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_parse_body_reports_malformed_json() {
        let result: Result<TimeEntry, ApiError> = parse_body(StatusCode::OK, "{not json");
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }
}
