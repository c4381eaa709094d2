use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("no file provided")]
    NoFileProvided,

    #[error("unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },

    /// The media host answered, but rejected the upload
    #[error("provider rejected upload: {message}")]
    Provider {
        message: String,
        http_code: Option<u16>,
    },

    /// The media host could not be reached or did not answer in time
    #[error("transport failure: {message}")]
    Transport { message: String },
}

impl UploadError {
    pub fn provider(message: impl Into<String>, http_code: Option<u16>) -> Self {
        Self::Provider {
            message: message.into(),
            http_code,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Whether the failure happened on the media host side of the relay
    pub fn is_provider_side(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Transport { .. })
    }
}
