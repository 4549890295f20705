use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{RwLock, mpsc};
use tower::ServiceExt; // for `oneshot`

use mediabox::api::models::{
    AvailableFormats, DownloadAccepted, FileEntry, JobState, PresetInfo, StatusRecord, VideoInfo,
};
use mediabox::api::{AppState, build_router};
use mediabox::config::Config;
use mediabox::observability::Metrics;
use mediabox::presets::ReencodeProfile;
use mediabox::queue::{Job, JobBroker, JobQueue};
use mediabox::status::StatusStore;
use mediabox::tools::{
    FetchOutcome, FetchRequest, MediaFetcher, ProgressSender, ToolError, ToolProgress, Transcoder,
};
use mediabox::worker::{self, WorkerContext};

/// Writes `<title>_<preset>.<ext>` into the output dir instead of running yt-dlp
struct FakeFetcher;

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: ProgressSender,
    ) -> Result<FetchOutcome, ToolError> {
        let _ = progress.send(ToolProgress::Downloading { percent: 100.0 });
        let _ = progress.send(ToolProgress::Finished);

        let ext = match request.mode {
            mediabox::presets::DownloadMode::Audio => "mp3",
            mediabox::presets::DownloadMode::AudioVideo => "mp4",
        };
        let file = request
            .output_dir
            .join(format!("Clip_{}.{ext}", request.file_suffix));
        tokio::fs::write(&file, b"media").await?;
        Ok(FetchOutcome { files: vec![file] })
    }

    async fn probe(&self, url: &str) -> Result<VideoInfo, ToolError> {
        if url.contains("missing") {
            return Err(ToolError::Failed {
                tool: "yt-dlp",
                exit_code: Some(1),
                message: "Video unavailable".to_string(),
            });
        }
        Ok(VideoInfo {
            title: "Clip".to_string(),
            duration: 212.0,
            url: url.to_string(),
            formats: AvailableFormats::default(),
        })
    }
}

struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn reencode(
        &self,
        _input: &Path,
        _profile: &ReencodeProfile,
        _progress: ProgressSender,
    ) -> Result<(), ToolError> {
        Err(ToolError::Failed {
            tool: "ffmpeg",
            exit_code: Some(1),
            message: "Conversion failed!".to_string(),
        })
    }
}

struct TestApp {
    app: Router,
    download_dir: PathBuf,
    ctx: WorkerContext,
    worker_rx: Option<mpsc::UnboundedReceiver<Job>>,
    _temp_dir: TempDir,
}

/// Creates a test config pointing every directory into `root`
fn create_test_config(root: &Path) -> Config {
    let config_toml = format!(
        r#"
[server]
bind_addr = "127.0.0.1:8080"
data_dir = "{data}"
download_dir = "{downloads}"
max_payload_bytes = "64KB"

[tools]
default_rate_limit = "2MB"
        "#,
        data = root.join("data").display(),
        downloads = root.join("downloads").display(),
    );

    toml::from_str(&config_toml).expect("Failed to parse test config")
}

/// Builds a test app with isolated dependencies. The worker is not started;
/// tests that need it call `start_worker`.
fn build_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(temp_dir.path());
    std::fs::create_dir_all(&config.server.download_dir).unwrap();

    let queue = Arc::new(RwLock::new(
        JobQueue::open(config.server.queue_path()).expect("Failed to open test queue"),
    ));
    let (broker, worker_rx) = JobBroker::new(queue);
    let broker = Arc::new(broker);
    let status = Arc::new(StatusStore::open(config.server.status_dir()).unwrap());
    let fetcher: Arc<dyn MediaFetcher> = Arc::new(FakeFetcher);
    let metrics = Arc::new(Metrics::new());

    let ctx = WorkerContext {
        broker: broker.clone(),
        status: status.clone(),
        fetcher: fetcher.clone(),
        transcoder: Arc::new(FailingTranscoder),
        metrics: metrics.clone(),
        download_dir: config.server.download_dir.clone(),
    };

    let download_dir = config.server.download_dir.clone();
    let state = AppState::new(config, broker, status, fetcher, metrics);

    TestApp {
        app: build_router(state),
        download_dir,
        ctx,
        worker_rx: Some(worker_rx),
        _temp_dir: temp_dir,
    }
}

impl TestApp {
    fn start_worker(&mut self) -> tokio::task::JoinHandle<()> {
        let rx = self.worker_rx.take().expect("worker already started");
        worker::spawn(self.ctx.clone(), rx)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = ServiceExt::<Request<Body>>::oneshot(self.app.clone(), request)
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn wait_for_terminal(&self, id: &str) -> StatusRecord {
        for _ in 0..200 {
            let (status, body) = self.get(&format!("/api/download-status/{id}")).await;
            assert_eq!(status, StatusCode::OK);
            let record: StatusRecord = serde_json::from_slice(&body).unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{id} never reached a terminal status");
    }
}

/// Helper to build a POST request with a JSON body
fn post_json(uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_submit_download_success() {
    let app = build_test_app();

    let (status, body) = app
        .send(post_json(
            "/api/download",
            json!({"urls": ["https://v.example/1", "https://v.example/2"]}),
        ))
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let accepted: DownloadAccepted = serde_json::from_slice(&body).unwrap();
    assert_eq!(accepted.download_ids, vec!["download_0", "download_1"]);

    // Every id has a record straight away
    for id in &accepted.download_ids {
        let (status, body) = app.get(&format!("/api/download-status/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        let record: StatusRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(record.status, JobState::Queued);
        assert_eq!(record.progress, 0);
    }
}

#[tokio::test]
async fn test_submit_download_ids_keep_increasing() {
    let app = build_test_app();

    app.send(post_json("/api/download", json!({"urls": ["https://v.example/1"]})))
        .await;
    let (_, body) = app
        .send(post_json("/api/download", json!({"urls": ["https://v.example/2"]})))
        .await;

    let accepted: DownloadAccepted = serde_json::from_slice(&body).unwrap();
    assert_eq!(accepted.download_ids, vec!["download_1"]);
}

#[tokio::test]
async fn test_submit_download_without_worker_accepts_nothing() {
    let mut app = build_test_app();
    drop(app.worker_rx.take());

    let (status, body) = app
        .send(post_json(
            "/api/download",
            json!({"urls": ["https://v.example/1", "https://v.example/2"]}),
        ))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], "SERVICE_UNAVAILABLE");

    let (status, _) = app.get("/api/download-status/download_0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.ctx.broker.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_submit_download_rejects_bad_payloads() {
    let app = build_test_app();

    let cases = [
        json!({"urls": []}),
        json!({}),
        json!({"urls": ["ftp://v.example/1"]}),
        json!({"urls": ["https://v.example/1"], "type": "video"}),
        json!({"urls": ["https://v.example/1"], "quality": "4k"}),
        json!({"urls": ["https://v.example/1"], "speed": "fast"}),
        json!({"urls": "https://v.example/1"}),
    ];

    for payload in cases {
        let (status, body) = app.send(post_json("/api/download", payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {payload}");

        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "INVALID_PAYLOAD");
    }
}

#[tokio::test]
async fn test_submit_download_invalid_content_type() {
    let app = build_test_app();

    let request = Request::builder()
        .uri("/api/download")
        .method("POST")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"urls": ["https://v.example/1"]}"#))
        .unwrap();

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_download_payload_too_large() {
    let app = build_test_app();

    let urls: Vec<String> = (0..100)
        .map(|i| format!("https://v.example/{}{i}", "a".repeat(1000)))
        .collect();
    let (status, body) = app
        .send(post_json("/api/download", json!({ "urls": urls })))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_download_status_not_found() {
    let app = build_test_app();

    let (status, body) = app.get("/api/download-status/download_42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_jobs_complete_through_worker() {
    let mut app = build_test_app();
    let worker = app.start_worker();

    let (_, body) = app
        .send(post_json(
            "/api/download",
            json!({
                "urls": ["https://v.example/1", "https://v.example/2"],
                "type": "audio+video",
                "quality": "minivan",
                "speed": 0
            }),
        ))
        .await;
    let accepted: DownloadAccepted = serde_json::from_slice(&body).unwrap();

    for id in &accepted.download_ids {
        let record = app.wait_for_terminal(id).await;
        // The re-encode fails, the download still counts as completed
        assert_eq!(record.status, JobState::Completed);
        assert_eq!(record.progress, 100);
    }

    let (_, body) = app.get("/api/downloads").await;
    let files: Vec<FileEntry> = serde_json::from_slice(&body).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "Clip_minivan.mp4");

    let (_, body) = app.get("/health").await;
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["metrics"]["jobs_completed"], 2);
    assert_eq!(health["metrics"]["reencodes_failed"], 2);

    worker.abort();
}

#[tokio::test]
async fn test_listed_links_serve_names_with_reserved_characters() {
    let app = build_test_app();
    std::fs::write(app.download_dir.join("My Clip #1.mp4"), b"video").unwrap();

    let (_, body) = app.get("/api/downloads").await;
    let files: Vec<FileEntry> = serde_json::from_slice(&body).unwrap();
    assert_eq!(files[0].path, "/download/My%20Clip%20%231.mp4");

    let (status, body) = app.get(&files[0].path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"video");
}

#[tokio::test]
async fn test_list_serve_delete_and_clear_files() {
    let app = build_test_app();
    std::fs::write(app.download_dir.join("b_720p.mp4"), b"video").unwrap();
    std::fs::write(app.download_dir.join("a_best.mp3"), b"audio!").unwrap();

    let (status, body) = app.get("/api/downloads").await;
    assert_eq!(status, StatusCode::OK);
    let files: Vec<FileEntry> = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        files,
        vec![
            FileEntry {
                name: "a_best.mp3".to_string(),
                size: 6,
                path: "/download/a_best.mp3".to_string(),
            },
            FileEntry {
                name: "b_720p.mp4".to_string(),
                size: 5,
                path: "/download/b_720p.mp4".to_string(),
            },
        ]
    );

    let response = ServiceExt::<Request<Body>>::oneshot(
        app.app.clone(),
        Request::builder()
            .uri("/download/b_720p.mp4")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"b_720p.mp4\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"video");

    let delete = Request::builder()
        .uri("/api/downloads/b_720p.mp4")
        .method("DELETE")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap(), json!({"success": true}));

    let (status, _) = app.get("/download/b_720p.mp4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let clear = Request::builder()
        .uri("/api/downloads/clear")
        .method("POST")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(clear).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
        json!({"success": true, "deleted": 1})
    );

    let (_, body) = app.get("/api/downloads").await;
    let files: Vec<FileEntry> = serde_json::from_slice(&body).unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_file_routes_reject_traversal() {
    let app = build_test_app();

    let (status, body) = app.get("/download/..%2Fdata%2Fsecret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], "INVALID_FILE_NAME");

    let delete = Request::builder()
        .uri("/api/downloads/..")
        .method("DELETE")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(delete).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_missing_file() {
    let app = build_test_app();

    let delete = Request::builder()
        .uri("/api/downloads/nothing.mp4")
        .method("DELETE")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(delete).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quality_presets_in_table_order() {
    let app = build_test_app();

    let (status, body) = app.get("/api/quality-presets").await;
    assert_eq!(status, StatusCode::OK);

    let presets: Vec<PresetInfo> = serde_json::from_slice(&body).unwrap();
    let ids: Vec<&str> = presets.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["minivan", "1080p", "720p", "480p", "best", "worst"]);
    assert_eq!(presets[0].name, "Minivan (720p H.264 AAC)");
}

#[tokio::test]
async fn test_video_info() {
    let app = build_test_app();

    let (status, body) = app
        .send(post_json("/api/video-info", json!({"url": "https://v.example/1"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let info: VideoInfo = serde_json::from_slice(&body).unwrap();
    assert_eq!(info.title, "Clip");
    assert_eq!(info.url, "https://v.example/1");

    let (status, body) = app
        .send(post_json("/api/video-info", json!({"url": "https://v.example/missing"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("Video unavailable"));

    let (status, _) = app.send(post_json("/api/video-info", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_app();

    let (status, body) = app.get("/health").await;

    // The worker channel is still open, so everything reports healthy
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.get("status").and_then(|v| v.as_str()), Some("healthy"));
    assert!(health.get("version").is_some());

    let components = health.get("components").unwrap().as_object().unwrap();
    assert!(components.contains_key("api"));
    assert!(components.contains_key("job_queue"));
    assert!(components.contains_key("worker"));
    assert!(components.contains_key("status_store"));
    assert_eq!(health["metrics"]["jobs_accepted"], 0);
}
