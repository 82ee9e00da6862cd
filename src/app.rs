#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::cache::{self, LoadedWorkbook};
use crate::layout::{self, Jitter, PanelLayoutConfig, PRESETS};
use crate::plotter::{self, MapOptions};
use crate::record::DefectSummary;

/// Default jitter seed, so the map is stable across renders of the same
/// upload unless the caller asks for a different one.
const DEFAULT_JITTER_SEED: u64 = 42;

pub struct AppState {
    /// The currently loaded workbook, shared by all routes.
    workbook: Mutex<Option<Arc<LoadedWorkbook>>>,
}

#[derive(Deserialize)]
struct MapQuery {
    preset: Option<String>,
    seed: Option<u64>,
}

#[derive(Serialize)]
struct UploadResponse {
    status: String,
    message: Option<String>,
    summary: Option<DefectSummary>,
}

impl UploadResponse {
    fn error(message: impl Into<String>) -> Self {
        UploadResponse {
            status: "error".to_string(),
            message: Some(message.into()),
            summary: None,
        }
    }
}

pub async fn run(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Setup app state
    let app_state = Arc::new(AppState {
        workbook: Mutex::new(None),
    });

    // Build router
    let app = Router::new()
        .route("/", get(serve_landing))
        .route("/dashboard", get(serve_dashboard))
        .route("/api/upload", post(upload_workbook))
        .route("/api/defects", get(get_defects))
        .route("/api/map.png", get(get_map))
        .route("/api/presets", get(get_presets))
        .route("/api/image/:defect_id/:modality", get(get_image))
        .with_state(app_state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/landing.html"))
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

/// Receive an uploaded workbook, run it through the cached ingestion
/// pipeline, and make it the active dataset.
async fn upload_workbook(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    // Process the multipart form data
    let mut file_data = Vec::new();

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() == Some("workbook") {
            file_data = field.bytes().await.unwrap_or_default().to_vec();
        }
    }

    if file_data.is_empty() {
        return Json(UploadResponse::error("No file data received")).into_response();
    }

    match cache::load_cached(&file_data) {
        Ok(loaded) => {
            let summary = DefectSummary::from_records(&loaded.records);
            log::info!(
                "loaded workbook: {} defects, {} images",
                loaded.records.len(),
                loaded.media.len()
            );
            *state.workbook.lock().unwrap() = Some(loaded);

            Json(UploadResponse {
                status: "ok".to_string(),
                message: None,
                summary: Some(summary),
            })
            .into_response()
        }
        Err(e) => {
            log::warn!("ingestion failed: {}", e);
            Json(UploadResponse::error(e.to_string())).into_response()
        }
    }
}

/// Render records plus summary for the active workbook.
async fn get_defects(
    Query(params): Query<MapQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(loaded) = state.workbook.lock().unwrap().clone() else {
        return no_workbook_response();
    };
    let Some(config) = resolve_preset(&params) else {
        return bad_preset_response();
    };

    let mut jitter = Jitter::seeded(params.seed.unwrap_or(DEFAULT_JITTER_SEED));
    let records = layout::transform(&loaded.records, &config, &mut jitter);

    Json(serde_json::json!({
        "config": config,
        "summary": DefectSummary::from_records(&loaded.records),
        "records": records,
        "images_paired": !loaded.pairing.is_empty(),
    }))
    .into_response()
}

/// The rendered defect map as a PNG image.
async fn get_map(
    Query(params): Query<MapQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(loaded) = state.workbook.lock().unwrap().clone() else {
        return no_workbook_response();
    };
    let Some(config) = resolve_preset(&params) else {
        return bad_preset_response();
    };

    let mut jitter = Jitter::seeded(params.seed.unwrap_or(DEFAULT_JITTER_SEED));
    let records = layout::transform(&loaded.records, &config, &mut jitter);

    match plotter::render_map(&records, &config, &MapOptions::default()) {
        Ok(png_data) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/png")
            .body(axum::body::Body::from(Bytes::from(png_data)))
            .unwrap(),
        Err(e) => {
            log::error!("map rendering failed: {}", e);
            Json(UploadResponse::error(e.to_string())).into_response()
        }
    }
}

/// One of the two embedded images paired with a defect.
async fn get_image(
    Path((defect_id, modality)): Path<(u32, u8)>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(loaded) = state.workbook.lock().unwrap().clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let index = match (loaded.pairing.get(&defect_id), modality) {
        (Some(pair), 1) => pair[0],
        (Some(pair), 2) => pair[1],
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    match loaded.media.get(index) {
        Some(media) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, media.content_type())
            .body(axum::body::Body::from(Bytes::from(media.bytes.clone())))
            .unwrap(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_presets() -> impl IntoResponse {
    let presets: Vec<_> = PRESETS
        .iter()
        .map(|(name, config)| {
            serde_json::json!({
                "name": name,
                "panel_size": config.panel_size,
                "gap_size": config.gap_size,
            })
        })
        .collect();

    Json(serde_json::json!({ "presets": presets }))
}

fn resolve_preset(params: &MapQuery) -> Option<PanelLayoutConfig> {
    match &params.preset {
        Some(name) => PanelLayoutConfig::preset(name),
        None => Some(PanelLayoutConfig::default()),
    }
}

fn no_workbook_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(UploadResponse::error("No workbook loaded")),
    )
        .into_response()
}

fn bad_preset_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(UploadResponse::error("Unknown layout preset")),
    )
        .into_response()
}
