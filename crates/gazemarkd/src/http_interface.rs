use crate::engine::{EngineError, EngineHandle};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gazemark_core::{process_batch, DatasetStats, FlagMode, IngestRequest, IngestSummary};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub flag_mode: FlagMode,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing data: {0}")]
    Body(JsonRejection),
    #[error("missing data: landmarks_data is required")]
    MissingLandmarks,
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Body(_) | ApiError::MissingLandmarks | ApiError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, detail = ?self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the HTTP surface: help page, ingest endpoint and statistics.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/receive_landmarks", post(receive_landmarks))
        .route("/stats", get(stats))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Augment a batch of samples with pupil points and append it to the dataset.
///
/// The whole batch is processed in memory before anything is written, so a
/// rejected request never touches the dataset file.
async fn receive_landmarks(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IngestSummary>, ApiError> {
    let Json(body) = payload.map_err(ApiError::Body)?;
    if body.get("landmarks_data").is_none() {
        return Err(ApiError::MissingLandmarks);
    }
    let request: IngestRequest = serde_json::from_value(body)?;

    let samples_received = request.landmarks_data.len();
    let batch = process_batch(request.landmarks_data, state.flag_mode);
    let pupil_info = batch.pupil_info;
    let total_samples = state.engine.append(batch.samples).await?;

    tracing::info!(
        received = samples_received,
        total = total_samples,
        pupil_left = pupil_info.pupil_left_added,
        pupil_right = pupil_info.pupil_right_added,
        landmarks_per_sample = pupil_info.total_landmarks_per_sample,
        "samples stored"
    );

    Ok(Json(IngestSummary {
        status: "success",
        samples_received,
        total_samples,
        metadata: request.metadata,
        pupil_info,
    }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<DatasetStats>, ApiError> {
    Ok(Json(state.engine.stats().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spawn_engine;
    use axum::body::Body;
    use axum::http::{header, Request};
    use gazemark_store::{DatasetStore, JsonFileStore};
    use std::path::{Path, PathBuf};
    use tower::ServiceExt;

    fn app(path: &Path) -> Router {
        let engine = spawn_engine(JsonFileStore::new(path)).unwrap();
        router(
            AppState {
                engine,
                flag_mode: FlagMode::Supplied,
            },
            1024 * 1024,
        )
    }

    fn dataset_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("dataset.json")
    }

    fn post_json(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/receive_landmarks")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn face(n: usize) -> Value {
        Value::Array(vec![json!([100.0, 200.0, -5.0]); n])
    }

    #[tokio::test]
    async fn test_ingest_appends_pupils_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset_path(&dir);
        let app = app(&path);

        let payload = json!({
            "landmarks_data": [
                { "timestamp": "t0", "landmarks": face(468), "pupil_left": [1, 2], "pupil_right": [3, 4, 5] },
                { "timestamp": "t1", "landmarks": face(468) },
            ],
            "metadata": { "export_type": "click_based_with_pupils" },
        });
        let (status, body) = send(&app, post_json(payload.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "success",
                "samples_received": 2,
                "total_samples": 2,
                "metadata": { "export_type": "click_based_with_pupils" },
                "pupil_info": {
                    "pupil_left_added": true,
                    "pupil_right_added": true,
                    "total_landmarks_per_sample": 470,
                },
            })
        );

        let stored = JsonFileStore::new(&path).read_all().unwrap().unwrap();
        assert_eq!(stored.len(), 2);
        let first = stored[0].landmarks.as_ref().and_then(Value::as_array).unwrap();
        assert_eq!(first[468], json!([1, 2, 0.0]));
        assert_eq!(first[469], json!([3, 4, 5]));
        let second = stored[1].landmarks.as_ref().and_then(Value::as_array).unwrap();
        assert_eq!(second[468], json!([0.0, 0.0, 0.0]));
        assert_eq!(second[469], json!([0.0, 0.0, 0.0]));
        assert_eq!(stored[1].pupil_flags(), (false, false));
        assert_eq!(stored[1].extra["timestamp"], json!("t1"));
    }

    #[tokio::test]
    async fn test_same_batch_twice_doubles_count() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dataset_path(&dir));
        let payload = json!({ "landmarks_data": [{ "landmarks": face(468) }, { "landmarks": face(468) }] });

        let (_, first) = send(&app, post_json(payload.to_string())).await;
        let (_, second) = send(&app, post_json(payload.to_string())).await;
        assert_eq!(first["total_samples"], json!(2));
        assert_eq!(second["samples_received"], json!(2));
        assert_eq!(second["total_samples"], json!(4));
    }

    #[tokio::test]
    async fn test_missing_landmarks_data_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset_path(&dir);
        let app = app(&path);

        let (status, body) = send(&app, post_json(json!({ "metadata": {} }).to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("landmarks_data"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_or_invalid_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dataset_path(&dir));

        let (status, body) = send(&app, post_json(Body::empty())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, post_json("{ nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mis_shaped_batch_is_rejected_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset_path(&dir);
        let app = app(&path);

        let payload = json!({
            "landmarks_data": [
                { "landmarks": face(468) },
                { "landmarks": face(468), "metadata": "not an object" },
            ]
        });
        let (status, body) = send(&app, post_json(payload.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid payload"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_pass_through_sample_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset_path(&dir);
        let app = app(&path);

        let payload = json!({ "landmarks_data": [{ "gaze_prediction": [640, 360] }] });
        let (status, body) = send(&app, post_json(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"], json!({}));
        assert_eq!(body["pupil_info"]["total_landmarks_per_sample"], json!(0));

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, json!([{ "gaze_prediction": [640, 360] }]));
    }

    #[tokio::test]
    async fn test_stats_without_dataset_reports_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dataset_path(&dir));

        let (status, body) = send(&app, get_request("/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("no_data"));
    }

    #[tokio::test]
    async fn test_stats_after_empty_batch_reports_empty() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dataset_path(&dir));

        let (status, _) = send(&app, post_json(json!({ "landmarks_data": [] }).to_string())).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, get_request("/stats")).await;
        assert_eq!(body, json!({ "status": "empty", "total_samples": 0 }));
    }

    #[tokio::test]
    async fn test_stats_over_ingested_samples() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dataset_path(&dir));

        let payload = json!({
            "landmarks_data": [
                { "landmarks": face(468), "pupil_left": [5, 6] },
                { "landmarks": face(468) },
                { "landmarks": face(469) },
            ]
        });
        send(&app, post_json(payload.to_string())).await;

        let (status, body) = send(&app, get_request("/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["total_samples"], json!(3));
        assert_eq!(body["samples_with_pupils"], json!(1));
        assert_eq!(body["landmark_count_range"], json!({ "min": 470, "max": 471 }));
        let avg = body["average_landmarks_per_sample"].as_f64().unwrap();
        assert!((avg - 470.333).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_corrupt_dataset_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset_path(&dir);
        std::fs::write(&path, "[{").unwrap();
        let app = app(&path);

        let (status, body) = send(&app, get_request("/stats")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());

        let payload = json!({ "landmarks_data": [{ "landmarks": face(468) }] });
        let (status, _) = send(&app, post_json(payload.to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{");
    }

    #[tokio::test]
    async fn test_index_page() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dataset_path(&dir));

        let resp = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("landmarks_data"));
    }
}
