//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/documents` | Library listing (`?filter=&sort=`) |
//! | `POST`   | `/documents` | Upload `{ filename, content_base64 }` |
//! | `GET`    | `/documents/{id}` | Full document with chunks |
//! | `DELETE` | `/documents/{id}` | Delete a document |
//! | `POST`   | `/search` | Semantic search `{ query, limit? }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unsupported_format` (400),
//! `embeddings_disabled` (400), `not_found` (404), `internal` (500).

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use docsearch_core::models::SearchResult;
use docsearch_core::CoreError;

use crate::config::{Config, RetrievalConfig};
use crate::embedding::EmbeddingsDisabled;
use crate::extract::ExtractError;
use crate::get::DocumentDetail;
use crate::library::{DocumentSummary, LibraryQuery};
use crate::progress::NoProgress;
use crate::service::{DocService, UploadReceipt};

/// Largest accepted request body (uploads arrive base64-encoded).
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    service: Arc<DocService>,
    retrieval: RetrievalConfig,
}

impl AppState {
    pub fn new(service: Arc<DocService>, retrieval: RetrievalConfig) -> Self {
        Self { service, retrieval }
    }
}

/// Build the router. Exposed separately from [`run_server`] for tests.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", get(handle_list).post(handle_upload))
        .route("/documents/{id}", get(handle_get).delete(handle_delete))
        .route("/search", post(handle_search))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Serve on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(DocService::from_config(config).await?);
    let app = router(AppState::new(service, config.retrieval.clone()));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    println!("docsearch listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Map a service error onto a status and code by inspecting its cause chain.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        for cause in err.chain() {
            if cause.downcast_ref::<EmbeddingsDisabled>().is_some() {
                return AppError {
                    status: StatusCode::BAD_REQUEST,
                    code: "embeddings_disabled",
                    message,
                };
            }
            if let Some(extract) = cause.downcast_ref::<ExtractError>() {
                return match extract {
                    ExtractError::UnsupportedFormat(_) => AppError {
                        status: StatusCode::BAD_REQUEST,
                        code: "unsupported_format",
                        message,
                    },
                    _ => bad_request(message),
                };
            }
            if let Some(core) = cause.downcast_ref::<CoreError>() {
                if matches!(core, CoreError::EmptyFilename) {
                    return bad_request(message);
                }
            }
        }

        tracing::error!(error = %message, "request failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message,
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    embeddings: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        embeddings: state.service.embedder().model_name().to_string(),
    })
}

// ============ /documents ============

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<DocumentSummary>,
}

async fn handle_list(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let docs = state.service.list(&query).await?;
    Ok(Json(ListResponse {
        documents: docs.iter().map(DocumentSummary::from).collect(),
    }))
}

#[derive(Deserialize)]
struct UploadRequest {
    filename: String,
    content_base64: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadReceipt>), AppError> {
    if req.filename.trim().is_empty() {
        return Err(bad_request("filename must not be empty"));
    }
    let bytes = BASE64
        .decode(req.content_base64.trim())
        .map_err(|e| bad_request(format!("content_base64 is not valid base64: {}", e)))?;

    let receipt = state
        .service
        .upload_bytes(&req.filename, &bytes, &NoProgress)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, AppError> {
    match state.service.get(&id).await? {
        Some(doc) => Ok(Json(DocumentDetail::from(&doc))),
        None => Err(not_found(format!("document not found: {}", id))),
    }
}

#[derive(Serialize)]
struct DeleteResponse {
    id: String,
    deleted: bool,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if state.service.delete(&id).await? {
        Ok(Json(DeleteResponse { id, deleted: true }))
    } else {
        Err(not_found(format!("document not found: {}", id)))
    }
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let limit = req.limit.unwrap_or(state.retrieval.default_limit);
    if limit < 1 || limit > state.retrieval.max_limit {
        return Err(bad_request(format!(
            "limit must be between 1 and {}",
            state.retrieval.max_limit
        )));
    }

    let results = state.service.search(&req.query, limit).await?;
    Ok(Json(SearchResponse { results }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use docsearch_core::chunk::ChunkConfig;
    use docsearch_core::embedding::Embedder;
    use docsearch_core::store::memory::InMemoryStore;
    use tower::ServiceExt;

    use crate::embedding::DisabledEmbedder;

    /// Scores "cat" text along one axis and everything else along another.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            if text.to_lowercase().contains("cat") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    fn app_with(embedder: Arc<dyn Embedder>) -> Router {
        let service = DocService::new(
            Arc::new(InMemoryStore::new()),
            embedder,
            ChunkConfig::default(),
            2,
        );
        router(AppState::new(Arc::new(service), RetrievalConfig::default()))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload(filename: &str, text: &str) -> Request<Body> {
        json_request(
            "POST",
            "/documents",
            serde_json::json!({ "filename": filename, "content_base64": BASE64.encode(text) }),
        )
    }

    #[tokio::test]
    async fn health_reports_version() {
        let app = app_with(Arc::new(DisabledEmbedder));
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["embeddings"], "disabled");
    }

    #[tokio::test]
    async fn upload_list_get_delete_roundtrip() {
        let app = app_with(Arc::new(KeywordEmbedder));

        let (status, receipt) = send(&app, upload("cats.txt", "The cat sat on the mat.")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["chunks"], 1);
        let id = receipt["id"].as_str().unwrap().to_string();

        let (status, list) = send(&app, Request::get("/documents").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["documents"].as_array().unwrap().len(), 1);
        assert_eq!(list["documents"][0]["filename"], "cats.txt");

        let uri = format!("/documents/{}", id);
        let (status, doc) = send(&app, Request::get(uri.as_str()).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["text"], "The cat sat on the mat.");
        assert_eq!(doc["chunks"][0]["embedded"], true);

        let (status, _) = send(&app, Request::delete(uri.as_str()).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, err) = send(&app, Request::delete(uri.as_str()).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn list_applies_filter_query() {
        let app = app_with(Arc::new(KeywordEmbedder));
        send(&app, upload("cats.txt", "The cat sat.")).await;
        send(&app, upload("dogs.txt", "The dog ran.")).await;

        let req = Request::get("/documents?filter=DOG&sort=filename_asc")
            .body(Body::empty())
            .unwrap();
        let (status, list) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let docs = list["documents"].as_array().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["filename"], "dogs.txt");
    }

    #[tokio::test]
    async fn search_ranks_best_document_first() {
        let app = app_with(Arc::new(KeywordEmbedder));
        send(&app, upload("dogs.txt", "The dog ran.")).await;
        send(&app, upload("cats.txt", "The cat sat.")).await;

        let (status, body) = send(
            &app,
            json_request("POST", "/search", serde_json::json!({ "query": "cat", "limit": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["filename"], "cats.txt");
        assert_eq!(results[0]["best_chunk"], "The cat sat.");
    }

    #[tokio::test]
    async fn search_validates_query_and_limit() {
        let app = app_with(Arc::new(KeywordEmbedder));

        let (status, body) = send(
            &app,
            json_request("POST", "/search", serde_json::json!({ "query": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");

        let (status, _) = send(
            &app,
            json_request("POST", "/search", serde_json::json!({ "query": "cat", "limit": 11 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            json_request("POST", "/search", serde_json::json!({ "query": "cat", "limit": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn disabled_embeddings_and_bad_formats_have_codes() {
        let app = app_with(Arc::new(DisabledEmbedder));

        let (status, body) = send(
            &app,
            json_request("POST", "/search", serde_json::json!({ "query": "cat" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "embeddings_disabled");

        let (status, body) = send(&app, upload("data.json", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "unsupported_format");

        let (status, body) = send(&app, upload("notes.txt", "some text")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["chunks"], 1);
    }

    #[tokio::test]
    async fn upload_rejects_bad_base64() {
        let app = app_with(Arc::new(KeywordEmbedder));
        let req = json_request(
            "POST",
            "/documents",
            serde_json::json!({ "filename": "a.txt", "content_base64": "!!!" }),
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
    }
}
