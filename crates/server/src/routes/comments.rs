use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::{Comment, NewComment},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/comments", get(list_comments).post(create_comment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub text: String,
    pub commenter_name: String,
}

async fn list_comments(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<Comment>>> {
    if state.store.project_by_id(project_id).await?.is_none() {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    Ok(Json(state.store.comments_for_project(project_id).await?))
}

async fn create_comment(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    if state.store.project_by_id(project_id).await?.is_none() {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    if body.text.trim().is_empty() {
        return Err(AppError::Validation("text is required".to_string()));
    }
    if body.commenter_name.trim().is_empty() {
        return Err(AppError::Validation("commenterName is required".to_string()));
    }

    let comment = state
        .store
        .add_comment(NewComment {
            project_id,
            text: body.text,
            commenter_name: body.commenter_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}
