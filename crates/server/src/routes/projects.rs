use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::{
        Activity, IssueType, NewProject, Project, ProjectPatch, ProgressStatus, UrgencyLevel,
    },
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", get(get_project))
        .route("/:id/upvote", post(upvote_project))
        .route("/:id/status", patch(set_status))
        .route("/:id/activities", get(list_activities))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsQuery {
    pub search: Option<String>,
    pub issue_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    pub issue_type: IssueType,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    #[serde(default)]
    pub urgency_level: UrgencyLevel,
    pub contact_email: Option<String>,
    pub email_subject: String,
    pub email_body: String,
    pub email_recipient: String,
    pub photo_url: Option<String>,
    pub photo_data: Option<String>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub progress_status: String,
}

async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectsQuery>,
) -> Result<Json<Vec<Project>>> {
    // Filter precedence: search, then issue type, then status. A blank search
    // query never reaches the store.
    let projects = if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
        state.store.search_projects(search.trim()).await?
    } else if let Some(issue_type) = query.issue_type {
        let issue_type = IssueType::parse(&issue_type)
            .ok_or_else(|| AppError::Validation(format!("Unknown issue type: {issue_type}")))?;
        state.store.projects_by_type(issue_type).await?
    } else if let Some(status) = query.status {
        let status = ProgressStatus::parse(&status)
            .ok_or_else(|| AppError::Validation(format!("Unknown status: {status}")))?;
        state.store.projects_by_status(status).await?
    } else {
        state.store.all_projects().await?
    };

    Ok(Json(projects))
}

async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>)> {
    for (field, value) in [
        ("title", &body.title),
        ("description", &body.description),
        ("location", &body.location),
        ("latitude", &body.latitude),
        ("longitude", &body.longitude),
        ("emailSubject", &body.email_subject),
        ("emailBody", &body.email_body),
        ("emailRecipient", &body.email_recipient),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} is required")));
        }
    }

    let project = state
        .store
        .create_project(NewProject {
            title: body.title,
            description: body.description,
            issue_type: body.issue_type,
            location: body.location,
            latitude: body.latitude,
            longitude: body.longitude,
            urgency_level: body.urgency_level,
            contact_email: body.contact_email,
            email_subject: body.email_subject,
            email_body: body.email_body,
            email_recipient: body.email_recipient,
            photo_url: body.photo_url,
            photo_data: body.photo_data,
            created_by: body.created_by,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Project>> {
    let project = state
        .store
        .project_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Ok(Json(project))
}

async fn upvote_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Project>> {
    let ip_address = client_ip(&headers);
    let project = state.store.upvote_project(id, None, &ip_address).await?;
    Ok(Json(project))
}

/// Manual status override. Deliberately a separate operation from the
/// automatic derivation path: only administrative statuses can be set here,
/// the derived ones always come from engagement counters.
async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<Project>> {
    let status = ProgressStatus::parse(&body.progress_status)
        .ok_or_else(|| AppError::Validation(format!("Unknown status: {}", body.progress_status)))?;
    if !status.is_manual() {
        return Err(AppError::Validation(
            "Only administrative statuses can be set manually".to_string(),
        ));
    }

    let project = state
        .store
        .update_project(
            id,
            ProjectPatch {
                progress_status: Some(status),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

async fn list_activities(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Activity>>> {
    if state.store.project_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    Ok(Json(state.store.activities_for_project(id).await?))
}

/// Origin address used for upvote deduplication. Proxy headers first, with a
/// sentinel when nothing identifies the caller.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_sentinel() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "198.51.100.2");
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
