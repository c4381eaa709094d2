use crate::Config;
use crate::api::routes::render_landing_page;
use crate::provider::CloudinaryClient;
use crate::relay::{MediaHost, UploadRelay};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub relay: UploadRelay,

    folder: Arc<str>,
    field_name: Arc<str>,
    max_file_size: usize,
    landing_page: Arc<str>,
}

impl AppState {
    /// Build the state around the Cloudinary client described by `config`
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let cloudinary = config.to_cloudinary_config()?;
        info!(
            cloud_name = %cloudinary.cloud_name,
            api_base_url = %cloudinary.api_base_url,
            "Cloudinary client configured"
        );
        let host = Arc::new(CloudinaryClient::new(cloudinary)?);
        Ok(Self::with_host(config, host))
    }

    /// Build the state around any media host
    pub fn with_host(config: &Config, host: Arc<dyn MediaHost>) -> Self {
        let allow_list = config.allow_list();
        let landing_page =
            render_landing_page(&config.field_name, config.max_file_size, &allow_list);
        let relay = UploadRelay::new(host, allow_list, config.upload_timeout());

        Self {
            relay,
            folder: config.folder.as_str().into(),
            field_name: config.field_name.as_str().into(),
            max_file_size: config.max_file_size,
            landing_page: landing_page.into(),
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn landing_page(&self) -> &str {
        &self.landing_page
    }
}
