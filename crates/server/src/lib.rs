pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod status;
pub mod store;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use services::{drafter::DraftService, mailer::MailTransport};
use store::Storage;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub drafter: Arc<dyn DraftService>,
    pub mailer: Arc<dyn MailTransport>,
    pub config: config::Config,
}

pub fn app(state: AppState) -> Router {
    let api_router = Router::new()
        .nest(
            "/projects",
            routes::projects::router().merge(routes::comments::router()),
        )
        .merge(routes::emails::router())
        .merge(routes::activities::router())
        .merge(routes::stats::router())
        .merge(routes::users::router());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
