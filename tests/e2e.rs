//! End-to-end tests for evidence-dossier.
//!
//! Every test drives the real router in-process with `tower::ServiceExt::oneshot`
//! against a case store in a fresh temp directory, then inspects both the
//! HTTP response and the files left on disk.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use evidence_dossier::{router, AppState, CaseStore, DossierConfig, ServerConfig};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct Harness {
    _dir: TempDir,
    store: Arc<CaseStore>,
    app: Router,
}

/// Route library logs to the test writer; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Harness {
    async fn new() -> Self {
        Self::with_server(ServerConfig::default()).await
    }

    async fn with_server(server: ServerConfig) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let config = DossierConfig::builder()
            .storage_root(dir.path())
            .build()
            .unwrap();
        let store = CaseStore::open(&config.storage_root).await.unwrap();
        let state = AppState::new(store, config);
        let store = Arc::clone(&state.store);
        let app = router(state, &server);
        Self {
            _dir: dir,
            store,
            app,
        }
    }

    fn case_dir(&self, case_id: &str) -> PathBuf {
        self.store.root().join(case_id)
    }

    async fn submit(&self, body: Value) -> Submitted {
        self.submit_with(Request::builder(), body.to_string()).await
    }

    async fn submit_with(&self, builder: axum::http::request::Builder, body: String) -> Submitted {
        let request = builder
            .method("POST")
            .uri("/api/report")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        Submitted {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, content_type, body)
    }
}

struct Submitted {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl Submitted {
    fn case_id(&self) -> String {
        self.headers
            .get("x-case-id")
            .expect("X-Case-Id header")
            .to_str()
            .unwrap()
            .to_string()
    }
}

fn jpeg(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade, 80, 160])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn listing(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn assert_valid_pdf(bytes: &[u8]) -> lopdf::Document {
    assert!(bytes.starts_with(b"%PDF-"), "not a PDF header");
    lopdf::Document::load_mem(bytes).expect("dossier parses as PDF")
}

// ── Ingestion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_image_no_video_no_meta() {
    let h = Harness::new().await;
    let photo = jpeg(64, 48, 10);

    let res = h.submit(json!({ "images": [data_uri("image/jpeg", &photo)] })).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        res.headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"evidence_dossier.pdf\""
    );
    assert_valid_pdf(&res.body);

    let case_id = res.case_id();
    assert!(case_id.starts_with("CASE_"));
    let dir = h.case_dir(&case_id);
    assert_eq!(listing(&dir), vec!["dossier.pdf", "evidence_1.jpg"]);
    assert_eq!(std::fs::read(dir.join("evidence_1.jpg")).unwrap(), photo);
    assert_eq!(std::fs::read(dir.join("dossier.pdf")).unwrap(), res.body);
    assert!(contains(&res.body, b"TRACKING DENIED"));
    assert!(contains(&res.body, b"(EXHIBIT #1 // SUSPECT CAPTURED)"));
}

#[tokio::test]
async fn location_meta_and_no_images() {
    let h = Harness::new().await;

    let res = h
        .submit(json!({
            "meta": { "userAgent": "FieldKit/3.1", "location": { "lat": 1.0, "lon": 2.0 } }
        }))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    let doc = assert_valid_pdf(&res.body);
    assert_eq!(doc.get_pages().len(), 1);
    assert!(contains(&res.body, b"https://www.google.com/maps?q=1,2"));
    assert!(contains(&res.body, b"FieldKit/3.1"));
    assert!(!contains(&res.body, b"TRACKING DENIED"));
    assert!(!contains(&res.body, b"EXHIBIT #"));
    assert_eq!(listing(&h.case_dir(&res.case_id())), vec!["dossier.pdf"]);
}

#[tokio::test]
async fn unparseable_video_still_succeeds_with_notice() {
    let h = Harness::new().await;

    let res = h
        .submit(json!({ "video": "data:video/webm;base64,***not base64***" }))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_valid_pdf(&res.body);
    assert!(contains(&res.body, b"VIDEO EVIDENCE SUBMITTED"));
    assert_eq!(listing(&h.case_dir(&res.case_id())), vec!["dossier.pdf"]);
}

#[tokio::test]
async fn valid_video_is_archived() {
    let h = Harness::new().await;
    let clip = b"\x1a\x45\xdf\xa3webm-ish bytes".to_vec();

    let res = h.submit(json!({ "video": data_uri("video/webm", &clip) })).await;

    assert_eq!(res.status, StatusCode::OK);
    let dir = h.case_dir(&res.case_id());
    assert_eq!(std::fs::read(dir.join("evidence_video.webm")).unwrap(), clip);
    assert!(contains(&res.body, b"VIDEO EVIDENCE SUBMITTED"));
}

#[tokio::test]
async fn empty_report_renders_header_only() {
    let h = Harness::new().await;

    let res = h.submit(json!({})).await;

    assert_eq!(res.status, StatusCode::OK);
    let doc = assert_valid_pdf(&res.body);
    assert_eq!(doc.get_pages().len(), 1);
    assert!(contains(&res.body, b"(EVIDENCE DOSSIER)"));
    assert!(contains(&res.body, b"(PHOTOGRAPHIC EVIDENCE)"));
    assert!(!contains(&res.body, b"EXHIBIT #"));
    assert!(!contains(&res.body, b"VIDEO EVIDENCE"));
}

#[tokio::test]
async fn corrupt_middle_image_keeps_original_numbers() {
    let h = Harness::new().await;

    let res = h
        .submit(json!({
            "images": [
                data_uri("image/jpeg", &jpeg(32, 32, 1)),
                "data:image/jpeg;base64,!!corrupt!!",
                data_uri("image/jpeg", &jpeg(32, 32, 2)),
            ]
        }))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(contains(&res.body, b"(EXHIBIT #1 // SUSPECT CAPTURED)"));
    assert!(contains(&res.body, b"(EXHIBIT #3 // SUSPECT CAPTURED)"));
    assert!(!contains(&res.body, b"EXHIBIT #2"));
    assert_eq!(
        listing(&h.case_dir(&res.case_id())),
        vec!["dossier.pdf", "evidence_1.jpg", "evidence_3.jpg"]
    );
}

#[tokio::test]
async fn forwarded_for_is_recorded() {
    let h = Harness::new().await;

    let res = h
        .submit_with(
            Request::builder().header("x-forwarded-for", "203.0.113.50, 10.1.1.1"),
            "{}".to_string(),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(contains(&res.body, b"203.0.113.50"));
    assert!(!contains(&res.body, b"10.1.1.1"));
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let h = Harness::new().await;

    let res = h
        .submit_with(Request::builder(), "{\"images\": [".to_string())
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(body["error"]["code"], "ERR_INVALID_REPORT");
}

#[tokio::test]
async fn oversized_report_is_payload_too_large() {
    let h = Harness::with_server(ServerConfig {
        max_body_bytes: 256,
        ..ServerConfig::default()
    })
    .await;

    let res = h
        .submit(json!({ "images": [data_uri("image/jpeg", &jpeg(32, 32, 40))] }))
        .await;

    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(body["error"]["code"], "ERR_INVALID_REPORT");
    assert!(std::fs::read_dir(h.store.root()).unwrap().next().is_none());
}

#[tokio::test]
async fn storage_failure_is_a_generic_server_error() {
    let h = Harness::new().await;
    let root = h.store.root().to_path_buf();
    // A plain file where the store root was: no case directory can be made.
    std::fs::remove_dir_all(&root).unwrap();
    std::fs::write(&root, b"not a directory").unwrap();

    let res = h
        .submit(json!({ "images": [data_uri("image/jpeg", &jpeg(8, 8, 1))] }))
        .await;
    std::fs::remove_file(&root).unwrap();

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.headers.get("x-case-id").is_none());
    let body: Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(body["error"]["code"], "ERR_INTERNAL");
    let text = String::from_utf8(res.body.clone()).unwrap();
    assert!(!text.contains(root.to_string_lossy().as_ref()));
    assert!(!text.contains("CASE_"));
}

#[tokio::test]
async fn concurrent_reports_get_distinct_cases() {
    let h = Harness::new().await;
    let photo = data_uri("image/jpeg", &jpeg(8, 8, 3));

    let submissions = (0..6).map(|_| h.submit(json!({ "images": [photo.clone()] })));
    let results = futures::future::join_all(submissions).await;

    let mut ids: Vec<String> = results
        .iter()
        .map(|r| {
            assert_eq!(r.status, StatusCode::OK);
            r.case_id()
        })
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 6);
    for id in &ids {
        assert_eq!(
            listing(&h.case_dir(id)),
            vec!["dossier.pdf", "evidence_1.jpg"]
        );
    }
}

// ── Retrieval ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn archived_image_matches_embedded_exhibit() {
    let h = Harness::new().await;
    let photo = jpeg(40, 30, 99);
    let res = h.submit(json!({ "images": [data_uri("image/jpeg", &photo)] })).await;
    let case_id = res.case_id();

    let (status, content_type, archived) =
        h.get(&format!("/evidence/{case_id}/evidence_1.jpg")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(archived, photo);
    assert!(contains(&res.body, &archived));
}

#[tokio::test]
async fn dossier_artifact_is_served_as_pdf() {
    let h = Harness::new().await;
    let res = h.submit(json!({})).await;

    let (status, content_type, body) =
        h.get(&format!("/evidence/{}/dossier.pdf", res.case_id())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/pdf"));
    assert_eq!(body, res.body);
}

#[tokio::test]
async fn case_listing() {
    let h = Harness::new().await;
    let res = h
        .submit(json!({ "images": [data_uri("image/jpeg", &jpeg(8, 8, 4))] }))
        .await;
    let case_id = res.case_id();

    let (status, _, body) = h.get(&format!("/evidence/{case_id}")).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["case_id"], case_id.as_str());
    let names: Vec<&str> = body["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["dossier.pdf", "evidence_1.jpg"]);
    assert_eq!(body["artifacts"][0]["size_bytes"], res.body.len() as u64);
}

#[tokio::test]
async fn traversal_is_rejected() {
    let h = Harness::new().await;
    let res = h.submit(json!({})).await;
    let case_id = res.case_id();
    std::fs::write(h.store.root().join("secret.txt"), b"outside").unwrap();

    for uri in [
        format!("/evidence/{case_id}/..%2Fsecret.txt"),
        format!("/evidence/{case_id}/..%2F..%2Fetc%2Fpasswd"),
        format!("/evidence/{case_id}/.."),
        "/evidence/..%2F..%2Fetc/passwd".to_string(),
        "/evidence/not-a-case/dossier.pdf".to_string(),
    ] {
        let (status, _, body) = h.get(&uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(!contains(&body, b"outside"), "{uri}");
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "ERR_INVALID_PATH", "{uri}");
    }
}

#[tokio::test]
async fn missing_things_are_not_found() {
    let h = Harness::new().await;
    let res = h.submit(json!({})).await;

    let (status, _, _) = h
        .get(&format!("/evidence/{}/evidence_9.jpg", res.case_id()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = h.get("/evidence/CASE_1/dossier.pdf").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], "ERR_NOT_FOUND");

    let (status, _, _) = h.get("/evidence/CASE_1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn health_reports_version() {
    let (status, content_type, body) = tokio_test::block_on(async {
        let h = Harness::new().await;
        h.get("/health").await
    });

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
