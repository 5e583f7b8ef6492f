use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{
    error::AppError,
    utils::{
        config::{AcquisitionBackend, AppConfig},
        http::build_http_client,
    },
};
use tracing::info;
use url::Url;

use super::{firecrawl::FirecrawlAcquirer, url_text_retrieval::ReadabilityAcquirer};

/// Fetches a remote page and converts it to markdown text.
#[async_trait]
pub trait ContentAcquirer: Send + Sync {
    async fn acquire(&self, url: &Url) -> Result<String, AppError>;

    fn name(&self) -> &'static str;
}

/// Builds the configured acquisition backend.
pub fn acquirer_from_config(config: &AppConfig) -> Result<Arc<dyn ContentAcquirer>, AppError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let acquirer: Arc<dyn ContentAcquirer> = match config.acquisition_backend {
        AcquisitionBackend::Firecrawl => Arc::new(FirecrawlAcquirer::new(
            build_http_client(timeout)?,
            &config.firecrawl_base_url,
            &config.firecrawl_api_key,
            config.retry_attempts,
        )?),
        AcquisitionBackend::Readability => {
            Arc::new(ReadabilityAcquirer::new(timeout, config.retry_attempts)?)
        }
    };

    info!(backend = acquirer.name(), "content acquirer configured");
    Ok(acquirer)
}
