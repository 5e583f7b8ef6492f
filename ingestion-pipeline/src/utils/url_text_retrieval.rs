use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use common::{
    error::AppError,
    utils::http::{ensure_success, with_retry},
};
use dom_smoothie::{Article, Readability, TextMode};
use reqwest::redirect::Policy;
use tracing::{info, warn};
use url::{Host, Url};

use super::acquisition::ContentAcquirer;

const PROVIDER: &str = "readability";
const MAX_REDIRECTS: usize = 10;

/// Fetches a page directly and keeps its main article as markdown.
#[derive(Clone)]
pub struct ReadabilityAcquirer {
    http: reqwest::Client,
    attempts: usize,
}

impl ReadabilityAcquirer {
    /// The client re-checks the host of every redirect hop.
    pub fn new(timeout: Duration, attempts: usize) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(guarded_redirect_policy())
            .build()?;

        Ok(Self {
            http,
            attempts: attempts.max(1),
        })
    }
}

/// Follows a redirect only when its target passes [`ensure_ingestion_url_allowed`].
pub fn guarded_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match ensure_ingestion_url_allowed(attempt.url()) {
            Ok(_) => attempt.follow(),
            Err(err) => attempt.error(err.to_string()),
        }
    })
}

#[async_trait]
impl ContentAcquirer for ReadabilityAcquirer {
    async fn acquire(&self, url: &Url) -> Result<String, AppError> {
        info!(%url, "Fetching URL");
        let now = Instant::now();

        let http = &self.http;
        let raw_content = with_retry(PROVIDER, self.attempts, || async move {
            let response = http.get(url.as_str()).send().await?;
            Ok(ensure_success(PROVIDER, response).await?.text().await?)
        })
        .await?;

        let markdown = extract_markdown(raw_content, url)?;
        info!(
            %url,
            elapsed_ms = u64::try_from(now.elapsed().as_millis()).unwrap_or(u64::MAX),
            chars = markdown.chars().count(),
            "URL converted to markdown"
        );

        Ok(markdown)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

fn extract_markdown(html: String, url: &Url) -> Result<String, AppError> {
    let config = dom_smoothie::Config {
        text_mode: TextMode::Markdown,
        ..Default::default()
    };
    let mut readability = Readability::new(html, Some(url.as_str()), Some(config))?;
    let article: Article = readability.parse()?;
    Ok(article.text_content.into())
}

/// Rejects URLs that are not public http(s) addresses. Returns the host.
pub fn ensure_ingestion_url_allowed(url: &Url) -> Result<String, AppError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            warn!(%url, %scheme, "Rejected ingestion URL due to unsupported scheme");
            return Err(AppError::Validation(
                "Unsupported URL scheme for ingestion".to_string(),
            ));
        }
    }

    let disallowed = match url.host() {
        None => {
            warn!(%url, "Rejected ingestion URL missing host");
            return Err(AppError::Validation(
                "URL is missing a host component".to_string(),
            ));
        }
        Some(Host::Domain(domain)) => {
            domain.eq_ignore_ascii_case("localhost") || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(v4)) => is_restricted_ip(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_restricted_ip(IpAddr::V6(v6)),
    };

    let host = url.host_str().unwrap_or_default().to_string();
    if disallowed {
        warn!(%url, %host, "Rejected ingestion URL pointing to restricted host");
        return Err(AppError::Validation(
            "Ingestion URL host is not allowed".to_string(),
        ));
    }

    Ok(host)
}

fn is_restricted_ip(ip: IpAddr) -> bool {
    let ranged = match ip {
        IpAddr::V4(v4) => restricted_v4(v4),
        IpAddr::V6(v6) => restricted_v6(v6),
    };
    ranged || ip.is_loopback() || ip.is_unspecified() || ip.is_multicast()
}

fn restricted_v4(v4: Ipv4Addr) -> bool {
    v4.is_private() || v4.is_link_local() || v4.is_broadcast()
}

fn restricted_v6(v6: Ipv6Addr) -> bool {
    if let Some(mapped) = v6.to_ipv4_mapped() {
        return is_restricted_ip(IpAddr::V4(mapped));
    }
    v6.is_unique_local() || v6.is_unicast_link_local()
}
