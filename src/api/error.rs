use crate::relay::UploadError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

pub const NO_FILE_MESSAGE: &str = "No file uploaded.";
pub const UNSUPPORTED_TYPE_MESSAGE: &str = "Unsupported file type.";
pub const MULTIPLE_FILES_MESSAGE: &str = "Only one file may be uploaded.";
pub const MALFORMED_BODY_MESSAGE: &str = "Malformed multipart body.";
pub const TOO_LARGE_MESSAGE: &str = "File too large.";
pub const PROVIDER_ERROR_MESSAGE: &str = "Cloudinary upload error";

/// Provider failure details echoed back to the client
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProviderErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderErrorDetail>,
}

/// Every way the upload endpoint can fail, mapped to a status and JSON body
#[derive(Debug)]
pub enum ApiError {
    NoFile,
    UnsupportedType(String),
    MultipleFiles,
    MalformedBody(String),
    TooLarge,
    Provider(ProviderErrorDetail),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoFile | Self::UnsupportedType(_) | Self::MultipleFiles | Self::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::NoFile => NO_FILE_MESSAGE,
            Self::UnsupportedType(_) => UNSUPPORTED_TYPE_MESSAGE,
            Self::MultipleFiles => MULTIPLE_FILES_MESSAGE,
            Self::MalformedBody(_) => MALFORMED_BODY_MESSAGE,
            Self::TooLarge => TOO_LARGE_MESSAGE,
            Self::Provider(_) => PROVIDER_ERROR_MESSAGE,
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::NoFileProvided => Self::NoFile,
            UploadError::UnsupportedType { mime_type } => Self::UnsupportedType(mime_type),
            UploadError::Provider { message, http_code } => {
                Self::Provider(ProviderErrorDetail { message, http_code })
            }
            UploadError::Transport { message } => Self::Provider(ProviderErrorDetail {
                message,
                http_code: None,
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        let detail = match self {
            Self::Provider(detail) => {
                error!(error = %detail.message, http_code = ?detail.http_code, "Upload relay failed");
                Some(detail)
            }
            Self::UnsupportedType(mime_type) => {
                warn!(%mime_type, "Rejected upload");
                None
            }
            Self::MalformedBody(reason) => {
                warn!(%reason, "Rejected upload");
                None
            }
            _ => {
                warn!(reason = message, "Rejected upload");
                None
            }
        };

        (
            status,
            Json(ErrorResponse {
                message,
                error: detail,
            }),
        )
            .into_response()
    }
}
