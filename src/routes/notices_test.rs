use crate::routes::test_support::{call, send};
use crate::state::test_helpers;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

const BOUNDARY: &str = "floorboard-test-boundary";

fn multipart_request(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload-pdf")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_then_serve_then_delete() {
    let (state, _clock) = test_helpers::test_app_state(1_700_000_000_000).await;

    let (status, body) = send(&state, multipart_request("file", "safety memo.pdf", "application/pdf", b"%PDF-1.7 test")).await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap().to_owned();
    assert!(url.starts_with("/uploads/pdfs/1700000000000-"));
    assert!(url.ends_with("-safety_memo.pdf"));

    let served = crate::routes::app(state.clone())
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(served.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.7 test");

    let (status, _) = call(&state, Method::DELETE, "/api/delete-pdf", Some(json!({"url": url})), &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&state, Method::DELETE, "/api/delete-pdf", Some(json!({"url": url})), &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "File not found");
}

#[tokio::test]
async fn upload_rejects_other_content_types() {
    let (state, _clock) = test_helpers::test_app_state(1).await;
    let (status, body) = send(&state, multipart_request("file", "photo.png", "image/png", b"\x89PNG")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only PDF files are allowed");
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let (state, _clock) = test_helpers::test_app_state(1).await;
    let (status, body) = send(&state, multipart_request("attachment", "memo.pdf", "application/pdf", b"%PDF")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let (mut state, _clock) = test_helpers::test_app_state(1).await;
    state.pdfs = crate::services::notices::PdfStore::new(state.pdfs.dir().to_path_buf(), 8);
    let (status, _) = send(&state, multipart_request("file", "big.pdf", "application/pdf", b"%PDF-0123456789")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn delete_without_url_is_bad_request() {
    let (state, _clock) = test_helpers::test_app_state(1).await;
    let (status, body) = call(&state, Method::DELETE, "/api/delete-pdf", Some(json!({})), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing URL");
}
