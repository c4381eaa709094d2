use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::provider::{CloudinaryConfig, SignatureAlgorithm};
use crate::relay::AllowList;

/// Main configuration structure that can be loaded from CLI, environment, or config file
///
/// Example configuration file content
/// # Image Relay Configuration
///
/// # Server configuration
/// listen_on_port = 3000
/// field_name = "file"
/// max_file_size = 10485760
///
/// # Cloudinary credentials
/// cloud_name = "demo"
/// api_key = "1234567890"
/// api_secret = "abcdefg"
///
/// # Upload behaviour
/// folder = "FoodDeliveryApp"
/// upload_timeout_secs = 30
/// allowed_types = ["image/jpeg", "image/png", "image/gif"]
/// signature_algorithm = "sha1"  # Options: "sha1" or "sha256"
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Configuration file path (values given on the command line win)
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Cloudinary cloud name
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<String>,

    /// Cloudinary API key
    #[arg(long, env = "CLOUDINARY_API_KEY", hide_env_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Cloudinary API secret
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,

    /// Cloudinary API base URL
    #[arg(long, env = "CLOUDINARY_API_BASE_URL", default_value = "https://api.cloudinary.com")]
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Digest used to sign upload requests: sha1 or sha256
    #[arg(long, env = "CLOUDINARY_SIGNATURE_ALGORITHM", default_value = "sha1")]
    #[serde(default = "default_signature_algorithm")]
    pub signature_algorithm: String,

    /// Destination folder on the media host
    #[arg(short, long, env = "UPLOAD_FOLDER", default_value = "FoodDeliveryApp")]
    #[serde(default = "default_folder")]
    pub folder: String,

    /// Multipart field carrying the file
    #[arg(long, env = "UPLOAD_FIELD_NAME", default_value = "file")]
    #[serde(default = "default_field_name")]
    pub field_name: String,

    /// Maximum accepted file size in bytes
    #[arg(short, long, env = "MAX_FILE_SIZE", default_value_t = 10 * 1024 * 1024)]
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Seconds to wait for the media host before giving up
    #[arg(short = 't', long, env = "UPLOAD_TIMEOUT_SECS", default_value_t = 30)]
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,

    /// Accepted MIME types, comma separated
    #[arg(
        long,
        env = "ALLOWED_MIME_TYPES",
        value_delimiter = ',',
        default_values_t = default_allowed_types()
    )]
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            config: None,
            cloud_name: None,
            api_key: None,
            api_secret: None,
            api_base_url: default_api_base_url(),
            signature_algorithm: default_signature_algorithm(),
            folder: default_folder(),
            field_name: default_field_name(),
            max_file_size: default_max_file_size(),
            upload_timeout_secs: default_upload_timeout_secs(),
            allowed_types: default_allowed_types(),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the environment and CLI args, optionally merging with a
    /// config file
    pub fn load() -> Result<Self> {
        // A missing .env file is fine, the environment may already be populated
        _ = dotenvy::dotenv();

        let mut config = Config::parse();

        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If CLI value is default, use file value
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.api_base_url == default_api_base_url() {
            self.api_base_url = file_config.api_base_url;
        }
        if self.signature_algorithm == default_signature_algorithm() {
            self.signature_algorithm = file_config.signature_algorithm;
        }
        if self.folder == default_folder() {
            self.folder = file_config.folder;
        }
        if self.field_name == default_field_name() {
            self.field_name = file_config.field_name;
        }
        if self.max_file_size == default_max_file_size() {
            self.max_file_size = file_config.max_file_size;
        }
        if self.upload_timeout_secs == default_upload_timeout_secs() {
            self.upload_timeout_secs = file_config.upload_timeout_secs;
        }
        if self.allowed_types == default_allowed_types() {
            self.allowed_types = file_config.allowed_types;
        }

        // For Option fields, CLI takes precedence if Some
        if self.cloud_name.is_none() {
            self.cloud_name = file_config.cloud_name;
        }
        if self.api_key.is_none() {
            self.api_key = file_config.api_key;
        }
        if self.api_secret.is_none() {
            self.api_secret = file_config.api_secret;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let missing = |value: &Option<String>| value.as_ref().map(|s| s.is_empty()).unwrap_or(true);

        if missing(&self.cloud_name) {
            return Err(anyhow::anyhow!(
                "Cloudinary cloud name is required (CLOUDINARY_CLOUD_NAME)"
            ));
        }
        if missing(&self.api_key) {
            return Err(anyhow::anyhow!(
                "Cloudinary API key is required (CLOUDINARY_API_KEY)"
            ));
        }
        if missing(&self.api_secret) {
            return Err(anyhow::anyhow!(
                "Cloudinary API secret is required (CLOUDINARY_API_SECRET)"
            ));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "API base URL must start with http:// or https://"
            ));
        }
        self.signature_algorithm.parse::<SignatureAlgorithm>()?;

        if self.folder.trim().is_empty() {
            return Err(anyhow::anyhow!("Upload folder cannot be empty"));
        }
        if self.field_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Upload field name cannot be empty"));
        }
        if self.max_file_size == 0 {
            return Err(anyhow::anyhow!("Maximum file size must be greater than 0"));
        }
        if self.upload_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Upload timeout must be greater than 0"));
        }
        if self.allowed_types.iter().all(|t| t.trim().is_empty()) {
            return Err(anyhow::anyhow!("At least one allowed MIME type is required"));
        }

        Ok(())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList::new(&self.allowed_types)
    }

    /// Convert to the provider client configuration
    pub fn to_cloudinary_config(&self) -> Result<CloudinaryConfig> {
        Ok(CloudinaryConfig {
            cloud_name: self.cloud_name.clone().context("cloud name is not set")?,
            api_key: self.api_key.clone().context("API key is not set")?,
            api_secret: self.api_secret.clone().context("API secret is not set")?,
            api_base_url: self.api_base_url.trim_end_matches('/').to_string(),
            signature_algorithm: self.signature_algorithm.parse()?,
            timeout: self.upload_timeout(),
        })
    }
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_api_base_url() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_signature_algorithm() -> String {
    "sha1".to_string()
}

fn default_folder() -> String {
    "FoodDeliveryApp".to_string()
}

fn default_field_name() -> String {
    "file".to_string()
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

fn default_upload_timeout_secs() -> u64 {
    30
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
    ]
}
