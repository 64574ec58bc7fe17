use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use serde_json::json;
use tokio_util::io::ReaderStream;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::attachment::{Attachment, AttachmentUploadSchema};
use crate::db::models::user::Actor;
use crate::utils::api_response::ApiResponse;
use crate::workflow::service::AttachmentUpload;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn attachment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/requests/{request_id}/attachments",
            post(upload_attachment)
                .get(list_attachments)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/attachments/{attachment_id}", get(download_attachment))
}

fn multipart_error(e: impl std::fmt::Display) -> ApiResponse<()> {
    ApiResponse::<()>::error(
        StatusCode::BAD_REQUEST,
        "Failed to process multipart data",
        Some(json!({ "message": e.to_string() })),
    )
}

/// Upload a supporting file for a request
///
/// Multipart fields: `file` (required), `version` (defaults to the latest
/// details version) and `title` (defaults to the file name).
#[utoipa::path(
    post,
    path = "/requests/{request_id}/attachments",
    params(("request_id" = String, Path, description = "Request id")),
    request_body(content = AttachmentUploadSchema, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Attachment stored", body = Attachment),
        (status = 400, description = "No file part or unknown version"),
        (status = 404, description = "Request not found")
    ),
    tag = "Attachments",
    security(("bearerAuth" = []))
)]
pub async fn upload_attachment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<String>,
    mut multipart: Multipart,
) -> Result<ApiResponse<Attachment>, ApiResponse<()>> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut version = None;
    let mut title = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let file_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, file_type, bytes.to_vec()));
            }
            Some("version") => {
                let raw = field.text().await.map_err(multipart_error)?;
                let parsed = raw.trim().parse::<i64>().map_err(|_| {
                    ApiResponse::<()>::error(
                        StatusCode::BAD_REQUEST,
                        format!("version '{raw}' is not a number"),
                        None,
                    )
                })?;
                version = Some(parsed);
            }
            Some("title") => {
                title = Some(field.text().await.map_err(multipart_error)?);
            }
            other => tracing::debug!("ignoring multipart field {:?}", other),
        }
    }

    let (file_name, file_type, bytes) = file.ok_or_else(|| {
        ApiResponse::<()>::error(StatusCode::BAD_REQUEST, "Missing 'file' part", None)
    })?;

    let attachment = state
        .workflow
        .add_attachment(
            &actor,
            &request_id,
            AttachmentUpload {
                file_name,
                file_type,
                version,
                title,
                bytes,
            },
        )
        .await?;
    Ok(ApiResponse::success(StatusCode::CREATED, "Attachment uploaded", attachment))
}

#[utoipa::path(
    get,
    path = "/requests/{request_id}/attachments",
    params(("request_id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Attachment metadata", body = Vec<Attachment>),
        (status = 404, description = "Request not found")
    ),
    tag = "Attachments",
    security(("bearerAuth" = []))
)]
pub async fn list_attachments(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<Vec<Attachment>>, ApiResponse<()>> {
    let attachments = state.workflow.attachments(&request_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Attachments retrieved", attachments))
}

/// Stream the stored bytes of an attachment
#[utoipa::path(
    get,
    path = "/attachments/{attachment_id}",
    params(("attachment_id" = String, Path, description = "Attachment UUID")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "Attachment not found")
    ),
    tag = "Attachments",
    security(("bearerAuth" = []))
)]
pub async fn download_attachment(
    State(state): State<AppState>,
    Path(attachment_id): Path<String>,
) -> Result<Response, ApiResponse<()>> {
    let (attachment, file) = state.workflow.open_attachment(&attachment_id).await?;

    let content_type = HeaderValue::from_str(&attachment.file_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        attachment.file_name.replace(['"', '\\'], "_")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let stream = ReaderStream::new(file);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[derive(OpenApi)]
#[openapi(
    paths(upload_attachment, list_attachments, download_attachment),
    components(schemas(Attachment, AttachmentUploadSchema)),
    tags(
        (name = "Attachments", description = "Supporting documents")
    )
)]
pub struct AttachmentDoc;
