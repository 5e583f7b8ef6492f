use async_trait::async_trait;
use common::{
    error::AppError,
    utils::http::{ensure_success, with_retry},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::acquisition::ContentAcquirer;

const PROVIDER: &str = "firecrawl";

/// Firecrawl `/v1/scrape` client returning the main content as markdown.
#[derive(Clone)]
pub struct FirecrawlAcquirer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    attempts: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 1],
    only_main_content: bool,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

impl FirecrawlAcquirer {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: &str,
        attempts: usize,
    ) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Validation("missing Firecrawl API key".into()));
        }
        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            attempts: attempts.max(1),
        })
    }
}

#[async_trait]
impl ContentAcquirer for FirecrawlAcquirer {
    async fn acquire(&self, url: &Url) -> Result<String, AppError> {
        let endpoint = format!("{}/v1/scrape", self.base_url);
        let body = ScrapeRequest {
            url: url.as_str(),
            formats: ["markdown"],
            only_main_content: true,
        };
        let (endpoint, body) = (&endpoint, &body);

        let response: ScrapeResponse = with_retry(PROVIDER, self.attempts, || async move {
            let response = self
                .http
                .post(endpoint)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await?;
            Ok(ensure_success(PROVIDER, response).await?.json().await?)
        })
        .await?;

        let markdown = scraped_markdown(response)?;
        debug!(%url, chars = markdown.chars().count(), "firecrawl scrape complete");
        Ok(markdown)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

fn scraped_markdown(response: ScrapeResponse) -> Result<String, AppError> {
    if !response.success {
        return Err(AppError::InternalError(format!(
            "firecrawl scrape unsuccessful: {}",
            response.error.as_deref().unwrap_or("no error detail")
        )));
    }
    Ok(response
        .data
        .and_then(|data| data.markdown)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_asks_for_main_content_markdown() {
        let body = ScrapeRequest {
            url: "https://www.aven.com/",
            formats: ["markdown"],
            only_main_content: true,
        };

        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({
                "url": "https://www.aven.com/",
                "formats": ["markdown"],
                "onlyMainContent": true
            })
        );
    }

    #[test]
    fn successful_scrape_yields_markdown() {
        let response: ScrapeResponse = serde_json::from_value(json!({
            "success": true,
            "data": {"markdown": "# Aven\n\nHome equity card.", "metadata": {"statusCode": 200}}
        }))
        .expect("parse");

        assert_eq!(
            scraped_markdown(response).expect("markdown"),
            "# Aven\n\nHome equity card."
        );
    }

    #[test]
    fn unsuccessful_scrape_is_an_error() {
        let response: ScrapeResponse = serde_json::from_value(json!({
            "success": false,
            "error": "blocked by robots.txt"
        }))
        .expect("parse");

        let err = scraped_markdown(response).expect_err("failure surfaces");
        assert!(err.to_string().contains("robots.txt"));
    }

    #[test]
    fn missing_markdown_is_empty_text() {
        let response: ScrapeResponse =
            serde_json::from_value(json!({"success": true, "data": {}})).expect("parse");
        assert_eq!(scraped_markdown(response).expect("ok"), "");
    }

    #[test]
    fn requires_api_key() {
        assert!(FirecrawlAcquirer::new(reqwest::Client::new(), "https://api.firecrawl.dev", " ", 3)
            .is_err());
    }
}
