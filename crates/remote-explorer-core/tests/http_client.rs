// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - HttpFileClient against a local axum server

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use remote_explorer_core::client::parse_server_url;
use remote_explorer_core::{
    ClientError, ClientSettings, ClipboardOperation, HttpFileClient, RemoteFileClient,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const BIG_FILE_LEN: usize = 10 * 1024 * 1024;

#[derive(Default)]
struct ServerState {
    requests: Mutex<Vec<String>>,
}

type Shared = Arc<ServerState>;

impl ServerState {
    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn listing(path: String, query: HashMap<String, String>) -> Response {
    if query.get("json").map(String::as_str) != Some("true") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if path == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Directory not found" })),
        )
            .into_response();
    }

    let child = if path.is_empty() {
        "photo.jpg".to_string()
    } else {
        format!("{}/photo.jpg", path)
    };

    Json(json!({
        "items": [
            {
                "name": "photo.jpg",
                "relative_path": child,
                "is_dir": false,
                "size": "2.1 MB",
                "modified": "2024-03-01 10:00",
                "is_image": true
            }
        ],
        "currentPath": path,
        "breadcrumbs": [{ "name": "Home", "path": "" }]
    }))
    .into_response()
}

async fn explorer_root(Query(query): Query<HashMap<String, String>>) -> Response {
    listing(String::new(), query)
}

async fn explorer(
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    listing(path, query)
}

async fn file_info(Path(path): Path<String>) -> Response {
    match path.as_str() {
        "broken.txt" => "<html>oops</html>".into_response(),
        "denied.txt" => Json(json!({ "success": false })).into_response(),
        _ => Json(json!({
            "success": true,
            "info": {
                "name": "notes.txt",
                "full_path": "/srv/files/notes.txt",
                "relative_path": path,
                "is_directory": false,
                "is_file": true,
                "size_formatted": "12 B",
                "size_bytes": 12,
                "modified": "2024-03-01 10:00",
                "mime_type": "text/plain",
                "extension": "txt"
            }
        }))
        .into_response(),
    }
}

async fn download(Path(path): Path<String>) -> Response {
    match path.as_str() {
        "big.bin" => vec![7u8; BIG_FILE_LEN].into_response(),
        "empty.txt" => Vec::<u8>::new().into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn upload(State(state): State<Shared>, mut multipart: Multipart) -> StatusCode {
    let mut file = String::new();
    let mut directory = String::from("<none>");

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name().unwrap_or_default() {
            "file" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let mime = field.content_type().unwrap_or_default().to_string();
                let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
                file = format!("{}:{}:{}", name, mime, len);
            }
            "directory" => directory = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }

    state.record(format!("upload:{}:{}", file, directory));
    StatusCode::OK
}

/// Form endpoints record their fields, sorted by key
async fn form_action(
    State(state): State<Shared>,
    Path(action): Path<String>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> StatusCode {
    let body: Vec<String> = fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    state.record(format!("{}?{}", action, body.join("&")));

    match action.as_str() {
        "delete" => StatusCode::NO_CONTENT,
        "cut" => StatusCode::CREATED,
        _ => StatusCode::OK,
    }
}

async fn copy_failure(State(state): State<Shared>) -> Response {
    state.record("copy".to_string());
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Source not found" })),
    )
        .into_response()
}

async fn start_server() -> (String, Shared) {
    let state: Shared = Arc::new(ServerState::default());

    let app = Router::new()
        .route("/", get(|| async { StatusCode::NOT_FOUND }))
        .route("/explorer", get(explorer_root))
        .route("/explorer/{*path}", get(explorer))
        .route("/file_info/{*path}", get(file_info))
        .route("/download/{*path}", get(download))
        .route("/upload", post(upload))
        .route("/copy", post(copy_failure))
        .route("/{action}", post(form_action))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn connected_client(base: &str) -> HttpFileClient {
    let client = HttpFileClient::new(&ClientSettings::default()).unwrap();
    client.set_base_url(Some(parse_server_url(base).unwrap()));
    client
}

#[tokio::test]
async fn test_list_directory_decodes_listing() {
    let (base, _state) = start_server().await;
    let client = connected_client(&base);

    let root = client.list_directory("").await.unwrap();
    assert_eq!(root.current_path, "");
    assert_eq!(root.items[0].relative_path, "photo.jpg");
    assert!(root.items[0].is_image);
    assert!(!root.items[0].is_video);

    let nested = client.list_directory("My Docs/2024").await.unwrap();
    assert_eq!(nested.current_path, "My Docs/2024");
    assert_eq!(nested.items[0].relative_path, "My Docs/2024/photo.jpg");
}

#[tokio::test]
async fn test_error_body_message_is_extracted() {
    let (base, _state) = start_server().await;
    let client = connected_client(&base);

    let err = client.list_directory("missing").await.unwrap_err();
    match err {
        ClientError::HttpStatus { code, message } => {
            assert_eq!(code, 404);
            assert_eq!(message.as_deref(), Some("Directory not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_info() {
    let (base, _state) = start_server().await;
    let client = connected_client(&base);

    let info = client.fetch_info("docs/notes.txt").await.unwrap();
    assert_eq!(info.relative_path, "docs/notes.txt");
    assert_eq!(info.size_bytes, Some(12));
    assert_eq!(info.created, None);
}

#[tokio::test]
async fn test_undecodable_body_keeps_raw_text() {
    let (base, _state) = start_server().await;
    let client = connected_client(&base);

    match client.fetch_info("broken.txt").await.unwrap_err() {
        ClientError::DecodeFailure { raw, .. } => assert_eq!(raw, "<html>oops</html>"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(matches!(
        client.fetch_info("denied.txt").await,
        Err(ClientError::DecodeFailure { .. })
    ));
}

#[tokio::test]
async fn test_liveness_accepts_not_found() {
    let (base, _state) = start_server().await;
    let client = HttpFileClient::new(&ClientSettings::default()).unwrap();

    assert!(client.test_connection(&base).await.unwrap());
    assert!(matches!(
        client.test_connection("http://127.0.0.1:1").await,
        Err(ClientError::Unreachable(_))
    ));
}

#[tokio::test]
async fn test_check_connection_requires_ok() {
    let (base, _state) = start_server().await;
    let client = connected_client(&base);

    assert!(!client.check_connection().await.unwrap());
}

#[tokio::test]
async fn test_missing_info_endpoint_is_none() {
    let (base, _state) = start_server().await;
    let client = HttpFileClient::new(&ClientSettings::default()).unwrap();

    assert_eq!(client.fetch_server_info(&base).await.unwrap(), None);
}

#[tokio::test]
async fn test_download_reports_progress() {
    let (base, _state) = start_server().await;
    let client = connected_client(&base);
    let seen = Mutex::new(Vec::new());
    let record = |fraction: f64| seen.lock().unwrap().push(fraction);

    let bytes = client.download("big.bin", &record).await.unwrap();

    assert_eq!(bytes.len(), BIG_FILE_LEN);
    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.first(), Some(&0.0));
    assert_eq!(seen.last(), Some(&1.0));
    assert!(seen.iter().any(|f| *f > 0.0 && *f < 1.0));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.iter().filter(|f| **f == 1.0).count(), 1);
}

#[tokio::test]
async fn test_download_of_empty_file_completes() {
    let (base, _state) = start_server().await;
    let client = connected_client(&base);
    let seen = Mutex::new(Vec::new());
    let record = |fraction: f64| seen.lock().unwrap().push(fraction);

    let bytes = client.download("empty.txt", &record).await.unwrap();

    assert!(bytes.is_empty());
    assert_eq!(seen.into_inner().unwrap(), vec![0.0, 1.0]);
}

#[tokio::test]
async fn test_upload_sends_file_and_directory() {
    let (base, state) = start_server().await;
    let client = connected_client(&base);

    client
        .upload(b"abc".to_vec(), "photo.jpg", "albums/2024")
        .await
        .unwrap();
    client.upload(b"x".to_vec(), "blob", "").await.unwrap();

    assert_eq!(
        state.requests(),
        vec![
            "upload:photo.jpg:image/jpeg:3:albums/2024",
            "upload:blob:application/octet-stream:1:<none>",
        ]
    );
}

#[tokio::test]
async fn test_form_operations() {
    let (base, state) = start_server().await;
    let client = connected_client(&base);

    client.rename("docs/a.txt", "b.txt").await.unwrap();
    client.delete("docs/b.txt").await.unwrap();
    client
        .paste("docs/b.txt", "", ClipboardOperation::Cut)
        .await
        .unwrap();
    client.move_entry("docs/b.txt", "archive").await.unwrap();
    client.create_folder("new", "").await.unwrap();
    client.create_file("todo.md", "- milk", "docs").await.unwrap();

    assert_eq!(
        state.requests(),
        vec![
            "rename?filepath=docs/a.txt&new_name=b.txt",
            "delete?filepath=docs/b.txt",
            "paste?operation=cut&source_path=docs/b.txt&target_dir=",
            "move?filepath=docs/b.txt&target_dir=archive",
            "create_folder?foldername=new",
            "create_file?content=- milk&directory=docs&filename=todo.md",
        ]
    );
}

#[tokio::test]
async fn test_status_outside_allow_list_fails() {
    let (base, _state) = start_server().await;
    let client = connected_client(&base);

    // 201 is not in the allow-list for marks
    assert!(matches!(
        client.mark_cut("a.txt").await,
        Err(ClientError::HttpStatus { code: 201, .. })
    ));

    match client.mark_copy("a.txt").await.unwrap_err() {
        ClientError::HttpStatus { code, message } => {
            assert_eq!(code, 500);
            assert_eq!(message.as_deref(), Some("Source not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_calls_without_server_are_rejected() {
    let client = HttpFileClient::new(&ClientSettings::default()).unwrap();
    assert!(matches!(
        client.list_directory("").await,
        Err(ClientError::InvalidAddress(_))
    ));
}
