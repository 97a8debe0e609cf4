use axum::{extract::State, routing::get, Json, Router};

use crate::{error::Result, models::CommunityStats, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(community_stats))
}

async fn community_stats(State(state): State<AppState>) -> Result<Json<CommunityStats>> {
    Ok(Json(state.store.community_stats().await?))
}
