use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{error::Result, models::Activity, AppState};

const DEFAULT_LIMIT: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/activities", get(recent_activities))
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    pub limit: Option<usize>,
}

async fn recent_activities(
    State(state): State<AppState>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<Vec<Activity>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.store.recent_activities(limit).await?))
}
