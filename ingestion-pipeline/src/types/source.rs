use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

pub const MAX_SLUG_LEN: usize = 64;
const HASH_SUFFIX_LEN: usize = 8;
pub const MANUAL_SOURCE: &str = "manual";

/// A remote page to scrape. Without an explicit `id` one is derived from the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SourceRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: None,
        }
    }
}

/// Hand-authored text indexed under an author-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualChunk {
    pub id: String,
    pub text: String,
    #[serde(default = "default_manual_source")]
    pub source: String,
}

fn default_manual_source() -> String {
    MANUAL_SOURCE.to_string()
}

impl ManualChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: default_manual_source(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestInput {
    Source(SourceRef),
    Manual(ManualChunk),
}

impl IngestInput {
    /// Human-readable handle for logs and reports.
    pub fn label(&self) -> &str {
        match self {
            Self::Source(source) => &source.url,
            Self::Manual(chunk) => &chunk.id,
        }
    }
}

impl From<SourceRef> for IngestInput {
    fn from(source: SourceRef) -> Self {
        Self::Source(source)
    }
}

impl From<ManualChunk> for IngestInput {
    fn from(chunk: ManualChunk) -> Self {
        Self::Manual(chunk)
    }
}

/// Stable chunk id for a URL: host, path and query slugged, e.g.
/// `https://www.aven.com/about` becomes `www-aven-com-about`.
///
/// Slugs past [`MAX_SLUG_LEN`] are cut and suffixed with a hash of the full URL.
pub fn derive_source_id(url: &Url) -> String {
    let mut raw = url.host_str().unwrap_or_default().to_string();
    raw.push_str(url.path());
    if let Some(query) = url.query() {
        raw.push('-');
        raw.push_str(query);
    }

    let slug = slugify(&raw);
    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }

    let digest = Sha256::digest(url.as_str().as_bytes());
    let suffix: String = digest
        .iter()
        .take(HASH_SUFFIX_LEN / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    // Slug is ASCII, so byte slicing lands on character boundaries.
    let head = slug[..MAX_SLUG_LEN - HASH_SUFFIX_LEN - 1].trim_end_matches('-');
    format!("{head}-{suffix}")
}

fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_for(raw: &str) -> String {
        derive_source_id(&Url::parse(raw).expect("url"))
    }

    #[test]
    fn slugs_host_and_path() {
        assert_eq!(id_for("https://www.aven.com/about"), "www-aven-com-about");
        assert_eq!(id_for("https://www.aven.com/"), "www-aven-com");
        assert_eq!(
            id_for("https://www.aven.com/how-it-works"),
            "www-aven-com-how-it-works"
        );
        assert_eq!(id_for("https://WWW.Aven.com/App/"), "www-aven-com-app");
    }

    #[test]
    fn derivation_is_stable() {
        assert_eq!(
            id_for("https://www.aven.com/reviews"),
            id_for("https://www.aven.com/reviews")
        );
    }

    #[test]
    fn long_urls_are_capped_and_stay_distinct() {
        let base = format!("https://www.aven.com/{}", "education/".repeat(10));
        let first = id_for(&format!("{base}first"));
        let second = id_for(&format!("{base}second"));

        assert!(first.len() <= MAX_SLUG_LEN);
        assert!(second.len() <= MAX_SLUG_LEN);
        assert_ne!(first, second);
        assert!(first.starts_with("www-aven-com-education-"));
    }

    #[test]
    fn manual_chunk_defaults_source() {
        let chunk: ManualChunk =
            serde_json::from_str(r#"{"id": "aven-fees", "text": "No annual fees."}"#)
                .expect("parse");

        assert_eq!(chunk.source, MANUAL_SOURCE);
        assert_eq!(IngestInput::from(chunk).label(), "aven-fees");
    }
}
