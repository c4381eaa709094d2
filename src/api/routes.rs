use crate::AppState;
use crate::api::error::ApiError;
use crate::relay::{AllowList, UploadError, UploadRequest};
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const LANDING_TEMPLATE: &str = include_str!("landing.html");
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadImageResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// Response extension telling the request log whether the media host was contacted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayAttempt {
    pub provider_called: bool,
}

impl RelayAttempt {
    fn from_outcome(outcome: &Result<String, UploadError>) -> Self {
        let provider_called = match outcome {
            Ok(_) => true,
            Err(error) => error.is_provider_side(),
        };
        Self { provider_called }
    }
}

/// File part pulled out of the multipart body
#[derive(Debug)]
struct FilePart {
    bytes: Bytes,
    mime_type: String,
    filename: Option<String>,
}

/// Fill the landing page with the limits this instance enforces
pub fn render_landing_page(
    field_name: &str,
    max_file_size: usize,
    allow_list: &AllowList,
) -> String {
    LANDING_TEMPLATE
        .replace("{{field_name}}", field_name)
        .replace("{{max_file_size}}", &format_size(max_file_size))
        .replace("{{allowed_types}}", &allow_list.types().join(", "))
}

fn format_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

pub async fn index(Extension(state): Extension<AppState>) -> Html<String> {
    Html(state.landing_page().to_string())
}

pub async fn upload_image(
    Extension(state): Extension<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    // A body that is not multipart at all carries no file
    let multipart = multipart.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Request body is not multipart");
        ApiError::NoFile
    })?;

    let file = read_file_part(multipart, state.field_name(), state.max_file_size())
        .await?
        .ok_or(ApiError::NoFile)?;

    info!(
        size = file.bytes.len(),
        mime_type = %file.mime_type,
        filename = ?file.filename,
        "Received upload"
    );

    let request = UploadRequest::new(file.bytes, file.mime_type, state.folder())
        .with_filename(file.filename);
    let outcome = state.relay.relay(request).await;
    let attempt = RelayAttempt::from_outcome(&outcome);

    let mut response = match outcome {
        Ok(image_url) => (StatusCode::OK, Json(UploadImageResponse { image_url })).into_response(),
        Err(error) => ApiError::from(error).into_response(),
    };
    response.extensions_mut().insert(attempt);
    Ok(response)
}

async fn read_file_part(
    mut multipart: Multipart,
    field_name: &str,
    max_file_size: usize,
) -> Result<Option<FilePart>, ApiError> {
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) || !is_file_field(&field) {
            continue;
        }
        if file.is_some() {
            return Err(ApiError::MultipleFiles);
        }

        let filename = field.file_name().map(str::to_string);
        // Only the declared type is checked against the allow-list
        let mime_type = field
            .content_type()
            .unwrap_or(FALLBACK_MIME_TYPE)
            .to_string();
        let bytes = read_limited(field, max_file_size).await?;

        file = Some(FilePart {
            bytes,
            mime_type,
            filename,
        });
    }

    Ok(file)
}

/// A part is a file only when it names one; other parts sharing the field name are ignored
fn is_file_field(field: &Field<'_>) -> bool {
    field.file_name().is_some()
}

async fn read_limited(mut field: Field<'_>, max_file_size: usize) -> Result<Bytes, ApiError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > max_file_size {
            return Err(ApiError::TooLarge);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

fn multipart_error(error: MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge
    } else {
        ApiError::MalformedBody(error.body_text())
    }
}
