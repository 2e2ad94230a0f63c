//! HTTP interface (feature `http`).
//!
//! | Route | Purpose |
//! |---|---|
//! | `POST /upload/excel` | multipart field `file`; `?format=` overrides the file name |
//! | `GET /records` | filtered, sorted, paginated JSON array of business fields |
//! | `GET /records/export` | same query, as the `records_export.json` attachment |
//!
//! Store work runs on the blocking pool.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;

use crate::config::ServiceConfig;
use crate::error::{IngestionError, QueryError, ServeError};
use crate::ingestion::IngestionFormat;
use crate::query::{ExportRow, QueryParams};
use crate::service::{DynStore, RecordService, open_store};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<RecordService<DynStore>>,
    max_upload_bytes: usize,
}

impl AppState {
    /// Wrap a service. Uploads larger than `max_upload_bytes` are refused.
    pub fn new(service: RecordService<DynStore>, max_upload_bytes: usize) -> Self {
        Self {
            service: Arc::new(service),
            max_upload_bytes,
        }
    }

    /// The wrapped service.
    pub fn service(&self) -> &RecordService<DynStore> {
        &self.service
    }
}

/// Query parameters accepted by the upload route.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UploadParams {
    /// Format name or extension (`xlsx`, `csv`, `json`, ...). Overrides the file name.
    pub format: Option<String>,
}

/// Multipart form field carrying the uploaded document.
pub const UPLOAD_FIELD: &str = "file";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/upload/excel", post(upload))
        .route("/records", get(list_records))
        .route("/records/export", get(export_records))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// Open the configured store and serve until the listener fails.
pub async fn serve(config: ServiceConfig) -> Result<(), ServeError> {
    config.validate()?;
    let addr = config.server.socket_addr()?;
    let store = open_store(&config.store)?;
    let service = RecordService::new(store, config.ingestion.to_options());
    let state = AppState::new(service, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("[http] listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// `POST /upload/excel`
///
/// The document is the `file` field of a `multipart/form-data` body. Its file name names the
/// upload in logs and picks the format when `?format=` is absent; otherwise Excel is assumed.
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Response {
    let format = match params.format.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) => match IngestionFormat::from_extension(name) {
            Some(f) => Some(f),
            None => {
                return error_response(StatusCode::BAD_REQUEST, &format!("unknown format '{name}'"));
            }
        },
    };

    let mut document: Option<(String, Bytes)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return multipart_error_response(&err),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let source = field.file_name().unwrap_or("upload").to_string();
        match field.bytes().await {
            Ok(bytes) => document = Some((source, bytes)),
            Err(err) => return multipart_error_response(&err),
        }
        break;
    }
    let Some((source, body)) = document else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("multipart field '{UPLOAD_FIELD}' is required"),
        );
    };
    if body.len() > state.max_upload_bytes {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "upload exceeds max_upload_bytes");
    }

    let service = Arc::clone(&state.service);
    let joined =
        tokio::task::spawn_blocking(move || service.ingest_bytes(body.to_vec(), &source, format)).await;
    match joined {
        Ok(Ok(summary)) => (StatusCode::OK, Json(summary)).into_response(),
        Ok(Err(err)) => ingestion_error_response(&err),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "ingestion task failed"),
    }
}

/// `GET /records`
pub async fn list_records(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(err) => return query_error_response(&err),
    };
    let service = Arc::clone(&state.service);
    match tokio::task::spawn_blocking(move || service.list(&query)).await {
        Ok(Ok(rows)) => {
            let rows: Vec<ExportRow> = rows.iter().map(ExportRow::from).collect();
            (StatusCode::OK, Json(rows)).into_response()
        }
        Ok(Err(err)) => query_error_response(&err),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "query task failed"),
    }
}

/// `GET /records/export`
pub async fn export_records(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(err) => return query_error_response(&err),
    };
    let service = Arc::clone(&state.service);
    match tokio::task::spawn_blocking(move || service.export(&query)).await {
        Ok(Ok(doc)) => {
            let disposition = format!("attachment; filename=\"{}\"", doc.file_name());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                doc.bytes,
            )
                .into_response()
        }
        Ok(Err(err)) => query_error_response(&err),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "export task failed"),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn multipart_error_response(err: &MultipartError) -> Response {
    error_response(err.status(), &err.body_text())
}

fn ingestion_error_response(err: &IngestionError) -> Response {
    match err {
        IngestionError::MissingColumns { columns } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": err.to_string(), "missing_columns": columns })),
        )
            .into_response(),
        IngestionError::Io(_) | IngestionError::Store(_) | IngestionError::Commit(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
        _ => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

fn query_error_response(err: &QueryError) -> Response {
    let status = match err {
        QueryError::InvalidSortOrder(_) => StatusCode::BAD_REQUEST,
        QueryError::Store(_) | QueryError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}
