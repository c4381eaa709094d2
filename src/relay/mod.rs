mod allow_list;
mod error;

pub use allow_list::AllowList;
pub use error::UploadError;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One file to forward, owned by the request that produced it
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Bytes,
    pub mime_type: String,
    pub folder: String,
    pub filename: Option<String>,
}

impl UploadRequest {
    pub fn new(
        bytes: impl Into<Bytes>,
        mime_type: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            folder: folder.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename;
        self
    }
}

/// External service that stores the bytes and hands back a public URL
#[async_trait]
pub trait MediaHost: Send + Sync {
    fn name(&self) -> &str;

    /// Transmit `request` and wait for the host's single terminal answer
    async fn upload(&self, request: &UploadRequest) -> Result<String, UploadError>;
}

/// Validates an upload and forwards it to the media host exactly once
#[derive(Clone)]
pub struct UploadRelay {
    host: Arc<dyn MediaHost>,
    allow_list: AllowList,
    timeout: Duration,
}

impl UploadRelay {
    pub fn new(host: Arc<dyn MediaHost>, allow_list: AllowList, timeout: Duration) -> Self {
        Self {
            host,
            allow_list,
            timeout,
        }
    }

    pub fn host_name(&self) -> &str {
        self.host.name()
    }

    pub async fn relay(&self, request: UploadRequest) -> Result<String, UploadError> {
        if !self.allow_list.allows(&request.mime_type) {
            return Err(UploadError::UnsupportedType {
                mime_type: request.mime_type,
            });
        }
        if request.bytes.is_empty() {
            return Err(UploadError::NoFileProvided);
        }

        let size = request.bytes.len();
        debug!(size, mime_type = %request.mime_type, folder = %request.folder, "Forwarding upload");

        let url = tokio::time::timeout(self.timeout, self.host.upload(&request))
            .await
            .map_err(|_| {
                UploadError::transport(format!(
                    "upload timed out after {}s",
                    self.timeout.as_secs_f64()
                ))
            })??;

        info!(size, host = self.host.name(), %url, "Upload completed");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Media host double that records how often it was called
    struct CountingHost {
        pub calls: AtomicUsize,
        pub outcome: Result<String, UploadError>,
        pub delay: Option<Duration>,
    }

    impl CountingHost {
        fn succeeding(url: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome: Ok(url.to_string()),
                delay: None,
            })
        }

        fn failing(error: UploadError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome: Err(error),
                delay: None,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaHost for CountingHost {
        fn name(&self) -> &str {
            "counting"
        }

        async fn upload(&self, _request: &UploadRequest) -> Result<String, UploadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcome.clone()
        }
    }

    fn relay_with(host: Arc<CountingHost>) -> UploadRelay {
        UploadRelay::new(host, AllowList::default(), Duration::from_secs(5))
    }

    fn png(size: usize) -> UploadRequest {
        UploadRequest::new(vec![0x89; size], "image/png", "FoodDeliveryApp")
    }

    #[tokio::test]
    async fn test_allowed_types_are_forwarded() {
        let host = CountingHost::succeeding("https://res.example.com/a.png");
        let relay = relay_with(host.clone());

        for mime_type in ["image/jpeg", "image/png", "image/gif"] {
            let request = UploadRequest::new(vec![1u8; 16], mime_type, "FoodDeliveryApp");
            let url = relay.relay(request).await.unwrap();
            assert_eq!(url, "https://res.example.com/a.png");
        }
        assert_eq!(host.calls(), 3);
    }

    #[tokio::test]
    async fn test_unsupported_type_never_reaches_host() {
        let host = CountingHost::succeeding("https://res.example.com/a.png");
        let relay = relay_with(host.clone());

        let request = UploadRequest::new(vec![1u8; 2048], "application/pdf", "FoodDeliveryApp");
        let err = relay.relay(request).await.unwrap_err();

        assert_eq!(
            err,
            UploadError::UnsupportedType {
                mime_type: "application/pdf".into()
            }
        );
        assert_eq!(host.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_buffer_never_reaches_host() {
        let host = CountingHost::succeeding("https://res.example.com/a.png");
        let relay = relay_with(host.clone());

        let err = relay.relay(png(0)).await.unwrap_err();
        assert_eq!(err, UploadError::NoFileProvided);
        assert_eq!(host.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_passed_through() {
        let host = CountingHost::failing(UploadError::provider("Invalid Signature", Some(401)));
        let relay = relay_with(host.clone());

        let err = relay.relay(png(2048)).await.unwrap_err();
        assert_eq!(err, UploadError::provider("Invalid Signature", Some(401)));
        assert!(err.is_provider_side());
        assert_eq!(host.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_host_times_out() {
        let host = Arc::new(CountingHost {
            calls: AtomicUsize::new(0),
            outcome: Ok("https://res.example.com/a.png".into()),
            delay: Some(Duration::from_secs(60)),
        });
        let relay = UploadRelay::new(host.clone(), AllowList::default(), Duration::from_millis(50));

        let err = relay.relay(png(16)).await.unwrap_err();
        assert!(matches!(err, UploadError::Transport { ref message } if message.contains("timed out")));
        assert_eq!(host.calls(), 1);
    }

    #[tokio::test]
    async fn test_repeated_uploads_are_independent() {
        let host = CountingHost::succeeding("https://res.example.com/a.png");
        let relay = relay_with(host.clone());

        assert!(relay.relay(png(2048)).await.is_ok());
        assert!(relay.relay(png(2048)).await.is_ok());
        assert_eq!(host.calls(), 2);
    }
}
