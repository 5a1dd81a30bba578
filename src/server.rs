use crate::config::AppConfig;
use crate::map::CrimeMap;
use crate::page::INDEX_HTML;
use crate::popup::Popup;
use crate::scale::ColorStop;
use crate::stats::RankRange;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    response::{Html, Json},
    routing::get,
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub map: CrimeMap,
    pub config: AppConfig,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct ScaleResponse {
    range: RankRange,
    stops: Vec<ColorStop>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let tile_service = ServeDir::new(&state.config.output.tile_dir);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/query", get(query_handler))
        .route("/api/zones", get(zones_handler))
        .route("/api/style", get(style_handler))
        .route("/api/scale", get(scale_handler))
        .nest_service("/tiles", tile_service)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, map: CrimeMap) -> Result<()> {
    let listener = bind(&config.server.host, config.server.port).await?;

    let state = Arc::new(AppState { map, config });
    let app = router(state);

    info!("Starting server on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Hover and click both land here; `null` when the point is in no zone.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<Popup>> {
    Json(state.map.popup_at(params.lon, params.lat))
}

async fn zones_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(state.map.collection.clone())
}

async fn style_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.map.style())
}

async fn scale_handler(State(state): State<Arc<AppState>>) -> Json<ScaleResponse> {
    Json(ScaleResponse {
        range: state.map.range,
        stops: state.map.stops.clone(),
    })
}
