/// File upload to the configured bucket
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Serialize;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::models::ErrorResponse;
use crate::AppState;

const UPLOAD_FAILED: &str = "There was an error uploading the file";
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub detail: String,
    pub file_url: String,
}

/// Multipart body with a single `file` part
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Upload a file
///
/// The part is spooled to a temporary file, which is removed whatever the
/// outcome, including a dropped connection.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded", body = UploadResponse),
        (status = 422, description = "No file part", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let (filename, file_url) = spool_and_store(&state, payload, &std::env::temp_dir()).await?;
    tracing::info!(filename = %filename, "File uploaded");

    Ok(HttpResponse::Created().json(UploadResponse {
        detail: format!("Successfully uploaded {filename}"),
        file_url,
    }))
}

/// Spool the `file` part into `spool_dir` and hand it to storage
///
/// The temporary file lives in a [`TempPath`] owned by this future, so it is
/// deleted on return and also when the future is dropped mid-upload.
async fn spool_and_store(
    state: &AppState,
    mut payload: Multipart,
    spool_dir: &Path,
) -> Result<(String, String)> {
    let (file, temp_path) = tempfile::Builder::new()
        .prefix("social-api-upload-")
        .tempfile_in(spool_dir)
        .map_err(|e| upload_failed(format!("Failed to create temporary file: {e}")))?
        .into_parts();

    receive_and_store(state, &mut payload, tokio::fs::File::from_std(file), &temp_path).await
}

async fn receive_and_store(
    state: &AppState,
    payload: &mut Multipart,
    mut file: tokio::fs::File,
    temp_path: &TempPath,
) -> Result<(String, String)> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| upload_failed(format!("Multipart error: {e}")))?;

        if field.name() != Some(FILE_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| upload_failed(format!("Multipart error: {e}")))?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .and_then(object_name)
            .ok_or_else(|| AppError::Validation("Uploaded file has no file name".to_string()))?;
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

        let mut size = 0usize;
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| upload_failed(format!("Multipart error: {e}")))?;
            size += chunk.len();
            file.write_all(&chunk)
                .await
                .map_err(|e| upload_failed(format!("Failed to write temporary file: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| upload_failed(format!("Failed to write temporary file: {e}")))?;
        drop(file);

        tracing::debug!(filename = %filename, size, "Upload received, sending to storage");

        let file_url = state
            .storage
            .upload_file(temp_path, &filename, &content_type)
            .await
            .map_err(|e| upload_failed(e.to_string()))?;

        return Ok((filename, file_url));
    }

    Err(AppError::Validation(format!("Field required: {FILE_FIELD}")))
}

fn upload_failed(reason: String) -> AppError {
    tracing::error!("Upload failed: {}", reason);
    AppError::Storage(UPLOAD_FAILED.to_string())
}

/// Object name for an uploaded file: the client's file name without any
/// directory part
fn object_name(filename: &str) -> Option<String> {
    let name = Path::new(&filename.replace('\\', "/"))
        .file_name()?
        .to_string_lossy()
        .trim()
        .to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure_routes;
    use crate::test_support::lazy_state;
    use actix_web::{
        error::PayloadError,
        http::{header, StatusCode},
        test, App,
    };
    use bytes::Bytes;
    use futures_util::stream;
    use std::time::Duration;

    const BOUNDARY: &str = "----socialapiboundary";

    fn multipart_body(field: &str, filename: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        )
    }

    #[actix_web::test]
    async fn test_object_name_strips_directories() {
        assert_eq!(object_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(object_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(object_name("C:\\Users\\ada\\cat.png").as_deref(), Some("cat.png"));
        assert_eq!(object_name("").as_deref(), None);
    }

    #[actix_web::test]
    async fn test_unconfigured_storage_reports_upload_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_state()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body("file", "hello.txt", "hello"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], UPLOAD_FAILED);
    }

    #[actix_web::test]
    async fn test_missing_file_part_is_unprocessable() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_state()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body("attachment", "hello.txt", "hello"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_stalled_upload_leaves_no_temporary_file() {
        let spool_dir = tempfile::tempdir().unwrap();
        let state = lazy_state();

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_str(&format!("multipart/form-data; boundary={BOUNDARY}"))
                .unwrap(),
        );
        let head = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"slow.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             partial"
        );
        let body = stream::iter(vec![Ok::<_, PayloadError>(Bytes::from(head))])
            .chain(stream::pending());
        let payload = Multipart::new(&headers, body);

        let outcome = tokio::time::timeout(
            Duration::from_millis(300),
            spool_and_store(&state, payload, spool_dir.path()),
        )
        .await;
        assert!(outcome.is_err(), "upload should still be waiting for data");

        let leftovers = std::fs::read_dir(spool_dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[actix_web::test]
    async fn test_failed_upload_removes_temporary_file() {
        let spool_dir = tempfile::tempdir().unwrap();
        let state = lazy_state();

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_str(&format!("multipart/form-data; boundary={BOUNDARY}"))
                .unwrap(),
        );
        let body = stream::iter(vec![Ok::<_, PayloadError>(Bytes::from(multipart_body(
            "file", "hello.txt", "hello",
        )))]);
        let payload = Multipart::new(&headers, body);

        let result = spool_and_store(&state, payload, spool_dir.path()).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(std::fs::read_dir(spool_dir.path()).unwrap().count(), 0);
    }
}
