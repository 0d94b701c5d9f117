//! HTTP surface.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /articles` | `{"results": [{"website", "articles", "error"?}, ...]}` |
//! | `GET /ping` | `{"pong": "..."}` |
//! | `GET /` | `index.html` from the static root |
//! | `GET /static/*` | files under `<static root>/static` |
//!
//! `/articles` answers 200 even when some sources fail; clients check each
//! entry's `error`.

use crate::aggregate;
use crate::models::AggregateResult;
use crate::orchestrator::Orchestrator;
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, instrument};

pub const PONG: &str = "News Article Scraper API is running";

#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            static_dir: static_dir.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let index = ServeFile::new(state.static_dir.join("index.html"));
    let assets = ServeDir::new(state.static_dir.join("static"));

    Router::new()
        .route("/articles", get(get_articles))
        .route("/ping", get(ping))
        .route_service("/", index)
        .nest_service("/static", assets)
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> Json<Value> {
    Json(json!({ "pong": PONG }))
}

/// Latest articles from every enabled source, grouped by website.
#[instrument(level = "info", skip_all)]
async fn get_articles(
    State(state): State<AppState>,
) -> Result<Json<AggregateResult>, (StatusCode, Json<Value>)> {
    match state.orchestrator.run_all().await {
        Ok(outcomes) => Ok(Json(aggregate::build(outcomes))),
        Err(e) => {
            error!(error = %e, "Article fan-out failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}
