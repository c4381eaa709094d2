use crate::relay::{MediaHost, UploadError, UploadRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

const DEFAULT_FILENAME: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha1,
    Sha256,
}

impl FromStr for SignatureAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(anyhow::anyhow!(
                "Unsupported signature algorithm: {other}. Use 'sha1' or 'sha256'"
            )),
        }
    }
}

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base_url: String,
    pub signature_algorithm: SignatureAlgorithm,
    pub timeout: Duration,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("signature_algorithm", &self.signature_algorithm)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Signs upload parameters the way Cloudinary verifies them: `k=v` pairs sorted by key and
/// joined with `&`, followed by the API secret, hex digest.
pub fn sign_params(
    params: &[(&str, &str)],
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let mut to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    to_sign.push_str(api_secret);

    match algorithm {
        SignatureAlgorithm::Sha1 => hex::encode(Sha1::digest(to_sign.as_bytes())),
        SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(to_sign.as_bytes())),
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    #[serde(default)]
    public_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signed uploads against the Cloudinary image upload API
pub struct CloudinaryClient {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.config.api_base_url, self.config.cloud_name
        )
    }

    fn build_form(&self, request: &UploadRequest, timestamp: u64) -> Result<Form, UploadError> {
        let timestamp = timestamp.to_string();
        let signature = sign_params(
            &[("folder", request.folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
            self.config.signature_algorithm,
        );

        let file = Part::stream_with_length(request.bytes.clone(), request.bytes.len() as u64)
            .file_name(
                request
                    .filename
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            )
            .mime_str(&request.mime_type)
            .map_err(|_| UploadError::UnsupportedType {
                mime_type: request.mime_type.clone(),
            })?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", request.folder.clone())
            .text("signature", signature);
        if self.config.signature_algorithm == SignatureAlgorithm::Sha256 {
            form = form.text("signature_algorithm", "sha256");
        }

        Ok(form)
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String, UploadError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let form = self.build_form(request, timestamp)?;
        let url = self.upload_url();

        debug!(%url, folder = %request.folder, "Sending upload to Cloudinary");
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                error!(%url, ?error, "Failed to reach Cloudinary");
                UploadError::transport(error.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            error!(%url, ?error, "Failed to read Cloudinary response");
            UploadError::transport(error.to_string())
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            warn!(status = %status, %message, "Cloudinary rejected upload");
            return Err(UploadError::provider(message, Some(status.as_u16())));
        }

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|error| {
            UploadError::provider(
                format!("unexpected response from Cloudinary: {error}"),
                Some(status.as_u16()),
            )
        })?;

        let Some(secure_url) = parsed.secure_url.filter(|u| !u.is_empty()) else {
            return Err(UploadError::provider(
                "Cloudinary response did not include secure_url",
                Some(status.as_u16()),
            ));
        };

        debug!(public_id = ?parsed.public_id, %secure_url, "Cloudinary upload stored");
        Ok(secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(algorithm: SignatureAlgorithm) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "1234".into(),
            api_secret: "abcd".into(),
            api_base_url: "https://api.cloudinary.com".into(),
            signature_algorithm: algorithm,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_signature_digests() {
        // Empty parameter list signs the secret alone
        assert_eq!(
            sign_params(&[], "abc", SignatureAlgorithm::Sha1),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            sign_params(&[], "abc", SignatureAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_signature_sorts_params() {
        let unsorted = sign_params(
            &[("timestamp", "1315060510"), ("folder", "FoodDeliveryApp")],
            "abcd",
            SignatureAlgorithm::Sha1,
        );
        let expected = hex::encode(Sha1::digest(
            b"folder=FoodDeliveryApp&timestamp=1315060510abcd",
        ));
        assert_eq!(unsorted, expected);
    }

    #[test]
    fn test_signature_algorithm_parsing() {
        assert_eq!("sha1".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha1);
        assert_eq!("SHA256".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha256);
        assert!("md5".parse::<SignatureAlgorithm>().is_err());
    }

    #[test]
    fn test_upload_url() {
        let client = CloudinaryClient::new(config(SignatureAlgorithm::Sha1)).unwrap();
        assert_eq!(
            client.upload_url(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", config(SignatureAlgorithm::Sha1));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("abcd"));
    }
}
