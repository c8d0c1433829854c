//! HTTP endpoint that stores uploaded archives in a local directory.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use futures_util::StreamExt;
use kmz_logging::{kmz_error, kmz_info, kmz_warn};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::filename::validate_upload_name;
use crate::persist::{AtomicFileWriter, PersistError};

pub const DEFAULT_UPLOAD_DIR: &str = "Upload";
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

const FILE_FIELD: &str = "file";
const UPLOADED: &str = "File uploaded successfully.";
const PROCESSING_ERROR: &str = "File processing error.";
const NO_FILE: &str = "No file uploaded.";
const INVALID_NAME: &str = "Invalid file name.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub bind: String,
    /// Largest accepted request body.
    pub max_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            bind: DEFAULT_BIND.to_string(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

type Reply = (StatusCode, &'static str);

pub fn upload_router(settings: &UploadSettings) -> Router {
    let writer = Arc::new(AtomicFileWriter::new(settings.dir.clone()));
    Router::new()
        .route("/upload", post(upload))
        .with_state(writer)
        .layer(DefaultBodyLimit::max(settings.max_bytes))
        .layer(CorsLayer::permissive())
}

/// Bind `settings.bind` and serve until the process ends.
pub async fn serve(settings: &UploadSettings) -> Result<(), UploadError> {
    let listener = TcpListener::bind(&settings.bind)
        .await
        .map_err(|source| UploadError::Bind {
            addr: settings.bind.clone(),
            source,
        })?;
    serve_on(listener, settings).await
}

pub async fn serve_on(listener: TcpListener, settings: &UploadSettings) -> Result<(), UploadError> {
    kmz_info!(
        "Upload endpoint listening on {} (storing into {})",
        listener.local_addr()?,
        settings.dir.display()
    );
    axum::serve(listener, upload_router(settings)).await?;
    Ok(())
}

async fn upload(
    State(writer): State<Arc<AtomicFileWriter>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Reply {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            kmz_warn!("Upload without multipart body: {}", rejection);
            return (StatusCode::BAD_REQUEST, NO_FILE);
        }
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return (StatusCode::BAD_REQUEST, NO_FILE),
            Err(err) => {
                kmz_warn!("Malformed upload body: {}", err);
                return (StatusCode::BAD_REQUEST, NO_FILE);
            }
        };
        if field.name() == Some(FILE_FIELD) {
            return store(&writer, field).await;
        }
    }
}

async fn store(writer: &AtomicFileWriter, mut field: Field<'_>) -> Reply {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let name = match validate_upload_name(&file_name) {
        Ok(name) => name,
        Err(err) => {
            kmz_warn!("Rejected upload name {:?}: {}", file_name, err);
            return (StatusCode::BAD_REQUEST, INVALID_NAME);
        }
    };

    let mut staged = match writer.stage() {
        Ok(staged) => staged,
        Err(err) => return storage_failed(name, &err),
    };
    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                kmz_error!("Upload of {} interrupted: {}", name, err);
                return (err.status(), PROCESSING_ERROR);
            }
        };
        if let Err(err) = staged.append(&chunk) {
            return storage_failed(name, &err);
        }
    }

    let size = staged.written();
    match staged.commit(name) {
        Ok(path) => {
            kmz_info!("Stored upload {} ({} bytes)", path.display(), size);
            (StatusCode::OK, UPLOADED)
        }
        Err(err) => storage_failed(name, &err),
    }
}

fn storage_failed(name: &str, err: &PersistError) -> Reply {
    kmz_error!("Failed to store upload {}: {}", name, err);
    (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR)
}
