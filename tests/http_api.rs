#![cfg(feature = "http")]

use axum::body::{Body, to_bytes};
use axum::extract::{FromRequest, Multipart, Query, State};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use work_records::http::{AppState, UPLOAD_FIELD, UploadParams, export_records, list_records, router, upload};
use work_records::ingestion::IngestionOptions;
use work_records::query::QueryParams;
use work_records::service::{DynStore, RecordService};
use work_records::store::MemoryStore;

const MAX_UPLOAD: usize = 64 * 1024;
const BOUNDARY: &str = "work-records-test-boundary";

fn state() -> AppState {
    let store: DynStore = Box::new(MemoryStore::new());
    AppState::new(RecordService::new(store, IngestionOptions::default()), MAX_UPLOAD)
}

/// Build the extractor the way axum does for a `multipart/form-data` request with one file field.
async fn form(field: &str, filename: &str, content: &[u8]) -> Multipart {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let req = Request::builder()
        .method("POST")
        .uri("/upload/excel")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    Multipart::from_request(req, &()).await.unwrap()
}

async fn file_form(filename: &str) -> Multipart {
    form(UPLOAD_FIELD, filename, &fixture()).await
}

fn no_params() -> Query<UploadParams> {
    Query(UploadParams::default())
}

fn fixture() -> Vec<u8> {
    std::fs::read("tests/fixtures/works.csv").unwrap()
}

async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn upload_returns_the_ingestion_summary() {
    let state = state();
    let resp = upload(State(state.clone()), no_params(), file_form("works.csv").await).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["inserted"], 3);
    assert_eq!(body["total_rows"], 5);
    assert_eq!(body["errors"][0]["row"], 5);
    assert_eq!(body["errors"][0]["error"], "exact duplicate already exists");
    assert_eq!(state.service().count().unwrap(), 3);
}

#[tokio::test]
async fn format_parameter_overrides_the_file_name() {
    let params = UploadParams {
        format: Some("csv".to_string()),
    };
    let resp = upload(State(state()), Query(params), file_form("works.bin").await).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["inserted"], 3);
}

#[tokio::test]
async fn upload_missing_columns_is_unprocessable() {
    let multipart = form(UPLOAD_FIELD, "partial.csv", b"record_id,object_id\n1,OBJ-1\n").await;
    let resp = upload(State(state()), no_params(), multipart).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(resp).await;
    assert_eq!(body["missing_columns"][0], "work_type");
    assert_eq!(body["missing_columns"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn upload_requires_the_file_field() {
    let multipart = form("document", "works.csv", &fixture()).await;
    let resp = upload(State(state()), no_params(), multipart).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("'file'"));
}

#[tokio::test]
async fn upload_rejects_unknown_format_and_oversized_files() {
    let params = UploadParams {
        format: Some("parquet".to_string()),
    };
    let resp = upload(State(state()), Query(params), file_form("works.csv").await).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let big = vec![b'a'; MAX_UPLOAD + 1];
    let resp = upload(State(state()), no_params(), form(UPLOAD_FIELD, "big.csv", &big).await).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn upload_without_a_usable_name_is_read_as_excel() {
    let resp = upload(State(state()), no_params(), file_form("works").await).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].is_string());
}

#[tokio::test]
async fn list_records_filters_and_validates_sort_order() {
    let state = state();
    let _ = upload(State(state.clone()), no_params(), file_form("works.csv").await).await;

    let params = QueryParams {
        contractor: Some("Borealis".to_string()),
        sort_by: Some("record_id".to_string()),
        sort_order: Some("desc".to_string()),
        ..Default::default()
    };
    let resp = list_records(State(state.clone()), Query(params)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rows = json_body(resp).await;
    let record_ids: Vec<i64> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["record_id"].as_i64().unwrap())
        .collect();
    assert_eq!(record_ids, vec![3, 2]);
    assert!(rows[0].get("id").is_none());
    assert_eq!(rows[0]["period"], "2024-03-16");

    let bad = QueryParams {
        sort_order: Some("up".to_string()),
        ..Default::default()
    };
    let resp = list_records(State(state), Query(bad)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_is_a_json_attachment() {
    let state = state();
    let _ = upload(State(state.clone()), no_params(), file_form("works.csv").await).await;

    let resp = export_records(State(state), Query(QueryParams::default())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"records_export.json\""
    );

    let rows = json_body(resp).await;
    assert_eq!(rows.as_array().unwrap().len(), 3);
    assert_eq!(rows[0]["period"], "2024-03-15");
    assert!(rows[0].get("id").is_none());
}

#[tokio::test]
async fn router_builds_with_all_routes() {
    let _app = router(state());
}
