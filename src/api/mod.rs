pub mod error;
pub mod middleware;
pub mod routes;

// Re-export public types and functions
pub use error::{ApiError, ErrorResponse, ProviderErrorDetail};
pub use middleware::log_request_outcome;
pub use routes::{RelayAttempt, UploadImageResponse, index, upload_image};
