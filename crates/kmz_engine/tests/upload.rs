mod common;

use std::fs;
use std::path::Path;

use common::init_logging;
use kmz_engine::{serve_on, UploadSettings};
use pretty_assertions::assert_eq;
use reqwest::multipart::{Form, Part};
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn start_server(dir: &Path, max_bytes: usize) -> String {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let settings = UploadSettings {
        dir: dir.to_path_buf(),
        bind: addr.to_string(),
        max_bytes,
    };
    tokio::spawn(async move {
        let _ = serve_on(listener, &settings).await;
    });
    format!("http://{addr}/upload")
}

fn file_form(name: &str, content: &[u8]) -> Form {
    Form::new()
        .percent_encode_noop()
        .part("file", Part::bytes(content.to_vec()).file_name(name.to_string()))
}

async fn post(url: &str, form: Form) -> (u16, String) {
    let response = reqwest::Client::new()
        .post(url)
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn upload_is_stored_under_its_original_name() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("Upload");
    let url = start_server(&dir, 1024 * 1024).await;

    let reply = post(&url, file_form("tiles.kmz", b"PK\x03\x04first")).await;
    assert_eq!(reply, (200, "File uploaded successfully.".to_string()));
    assert_eq!(fs::read(dir.join("tiles.kmz")).unwrap(), b"PK\x03\x04first");

    let reply = post(&url, file_form("tiles.kmz", b"second")).await;
    assert_eq!(reply.0, 200);
    assert_eq!(fs::read(dir.join("tiles.kmz")).unwrap(), b"second");
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
}

#[tokio::test]
async fn request_without_file_field_is_rejected() {
    let temp = TempDir::new().unwrap();
    let url = start_server(temp.path(), 1024).await;

    let form = Form::new().text("note", "no attachment");
    assert_eq!(post(&url, form).await, (400, "No file uploaded.".to_string()));

    let response = reqwest::Client::new()
        .post(&url)
        .body("plain body")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(response.text().await.unwrap(), "No file uploaded.");
}

#[tokio::test]
async fn traversal_names_never_leave_the_upload_dir() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("Upload");
    let url = start_server(&dir, 1024).await;

    for name in ["../escape.kmz", "..", "sub/inner.kmz", "nul.kmz", ""] {
        let reply = post(&url, file_form(name, b"data")).await;
        assert_eq!(reply, (400, "Invalid file name.".to_string()), "name {name:?}");
    }
    assert!(!temp.path().join("escape.kmz").exists());
    assert!(!dir.exists() || fs::read_dir(&dir).unwrap().count() == 0);
}

#[tokio::test]
async fn storage_failure_is_a_server_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("Upload");
    fs::write(&blocker, "a file where the directory should be").unwrap();
    let url = start_server(&blocker, 1024).await;

    let reply = post(&url, file_form("tiles.kmz", b"data")).await;
    assert_eq!(reply, (500, "File processing error.".to_string()));
}

#[tokio::test]
async fn oversized_body_is_not_stored() {
    let temp = TempDir::new().unwrap();
    let url = start_server(temp.path(), 1024).await;

    let result = reqwest::Client::new()
        .post(&url)
        .multipart(file_form("big.kmz", &vec![0u8; 64 * 1024]))
        .send()
        .await;
    if let Ok(response) = result {
        assert!(!response.status().is_success());
    }
    assert!(!temp.path().join("big.kmz").exists());
}
