//! HTTP surface for the annotation pipelines.
//!
//! Routes keep the paths and body shapes the visualization front-end already
//! posts. `data` may arrive inline or as a JSON-encoded string.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::annotate::{run_colors, ColorsOutput};
use crate::config::PipelineSettings;
use crate::error::AnnotateError;
use crate::oracle::Oracle;
use crate::qa::{ask_question, find_chapter, ChapterAnswer};
use crate::story::{FlexibleJson, Scene, StoryEntity, StoryType};
use crate::yaxis::run_yaxis;

/// Shared router state. The oracle is injected, never global.
#[derive(Clone)]
pub struct AppState {
    pub oracle: Arc<dyn Oracle>,
    pub settings: Arc<PipelineSettings>,
}

impl AppState {
    pub fn new(oracle: Arc<dyn Oracle>, settings: PipelineSettings) -> Self {
        Self {
            oracle,
            settings: Arc::new(settings),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewColorsRequest {
    pub data: FlexibleJson<Vec<StoryEntity>>,
    pub color_desc: String,
    #[serde(default)]
    pub palette_info: Option<String>,
    #[serde(default)]
    pub story_type: StoryType,
}

#[derive(Debug, Deserialize)]
pub struct NewYAxisRequest {
    pub data: FlexibleJson<Vec<Scene>>,
    pub yaxis_desc: String,
    #[serde(default)]
    pub story_type: StoryType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewYAxisResponse {
    pub new_data: Vec<Scene>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
}

/// Error body `{"error": message}` with a status code.
#[derive(Debug)]
pub struct ServerError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AnnotateError> for ServerError {
    fn from(err: AnnotateError) -> Self {
        let status = match err {
            AnnotateError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(error = %err, status = status.as_u16(), "request failed");
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .route("/new_colors", post(new_colors))
        .route("/new_yaxis", post(new_yaxis))
        .route("/ask_llm", post(ask_llm))
        .route("/find_chapter_with_llm", post(find_chapter_with_llm))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "annotator listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}

async fn index() -> &'static str {
    "backend"
}

async fn status() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn new_colors(
    State(state): State<AppState>,
    payload: Result<Json<NewColorsRequest>, JsonRejection>,
) -> Result<Json<ColorsOutput>, ServerError> {
    let Json(req) = payload?;
    let entities = req.data.into_inner();
    let output = run_colors(
        state.oracle.as_ref(),
        &entities,
        &req.color_desc,
        req.palette_info.as_deref(),
        req.story_type,
        &state.settings,
    )
    .await?;
    Ok(Json(output))
}

async fn new_yaxis(
    State(state): State<AppState>,
    payload: Result<Json<NewYAxisRequest>, JsonRejection>,
) -> Result<Json<NewYAxisResponse>, ServerError> {
    let Json(req) = payload?;
    let new_data = run_yaxis(
        state.oracle.as_ref(),
        req.data.into_inner(),
        &req.yaxis_desc,
        req.story_type,
        &state.settings,
    )
    .await?;
    Ok(Json(NewYAxisResponse { new_data }))
}

async fn ask_llm(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ServerError> {
    let Json(req) = payload?;
    let data = decode_data(req.data);
    let answer = ask_question(state.oracle.as_ref(), &data, &req.question).await?;
    Ok(Json(AnswerResponse { answer }))
}

async fn find_chapter_with_llm(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<ChapterAnswer>, ServerError> {
    let Json(req) = payload?;
    let data = decode_data(req.data);
    let answer = find_chapter(state.oracle.as_ref(), &data, &req.question).await?;
    Ok(Json(answer))
}

/// Question data is prompt context only; keep plain text when it isn't JSON.
fn decode_data(data: Value) -> Value {
    match data {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}
