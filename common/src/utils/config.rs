use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Gemini,
    OpenAI,
    Hashed,
}

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Pinecone,
    SurrealDb,
}

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionBackend {
    #[default]
    Firecrawl,
    Readability,
}

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingMode {
    #[default]
    Whole,
    Split,
}

/// Which process is starting; decides which credentials are mandatory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceRole {
    Query,
    Ingest,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(default)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub generation_model: String,
    pub generation_temperature: f32,

    pub embedding_backend: EmbeddingBackend,
    pub google_api_key: String,
    pub gemini_base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: u32,

    pub vector_backend: VectorBackend,
    pub pinecone_api_key: String,
    pub pinecone_host_url: String,
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub index_namespace: String,

    pub acquisition_backend: AcquisitionBackend,
    pub firecrawl_api_key: String,
    pub firecrawl_base_url: String,
    pub ingest_manifest_path: String,
    pub ingest_chunking: ChunkingMode,
    pub ingest_max_embed_chars: usize,
    pub ingest_chunk_min_chars: usize,
    pub ingest_chunk_max_chars: usize,
    pub ingest_chunk_overlap: usize,

    pub http_port: u16,
    pub request_timeout_secs: u64,
    pub retry_attempts: usize,
    pub dedupe_inflight: bool,

    pub guardrail_sensitive_phrases: Option<Vec<String>>,
    pub guardrail_toxic_terms: Option<Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            generation_model: "gpt-4".to_string(),
            generation_temperature: 0.7,
            embedding_backend: EmbeddingBackend::default(),
            google_api_key: String::new(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            embedding_dimensions: 768,
            vector_backend: VectorBackend::default(),
            pinecone_api_key: String::new(),
            pinecone_host_url: String::new(),
            surrealdb_address: String::new(),
            surrealdb_username: String::new(),
            surrealdb_password: String::new(),
            surrealdb_namespace: "askbase".to_string(),
            surrealdb_database: "knowledge".to_string(),
            index_namespace: "default".to_string(),
            acquisition_backend: AcquisitionBackend::default(),
            firecrawl_api_key: String::new(),
            firecrawl_base_url: "https://api.firecrawl.dev".to_string(),
            ingest_manifest_path: "ingest.json".to_string(),
            ingest_chunking: ChunkingMode::default(),
            ingest_max_embed_chars: 8_000,
            ingest_chunk_min_chars: 500,
            ingest_chunk_max_chars: 2_000,
            ingest_chunk_overlap: 100,
            http_port: 3000,
            request_timeout_secs: 30,
            retry_attempts: 3,
            dedupe_inflight: true,
            guardrail_sensitive_phrases: None,
            guardrail_toxic_terms: None,
        }
    }
}

impl AppConfig {
    /// Fails with every missing key at once so a misconfigured deploy is fixed in one pass.
    pub fn validate_for(&self, role: ServiceRole) -> Result<(), ConfigError> {
        let mut missing: Vec<&'static str> = Vec::new();
        let mut require = |key: &'static str, value: &str| {
            if value.trim().is_empty() {
                missing.push(key);
            }
        };

        if role == ServiceRole::Query {
            require("OPENAI_API_KEY", &self.openai_api_key);
        }

        match self.embedding_backend {
            EmbeddingBackend::Gemini => require("GOOGLE_API_KEY", &self.google_api_key),
            EmbeddingBackend::OpenAI => require("OPENAI_API_KEY", &self.openai_api_key),
            EmbeddingBackend::Hashed => {}
        }

        match self.vector_backend {
            VectorBackend::Pinecone => {
                require("PINECONE_API_KEY", &self.pinecone_api_key);
                require("PINECONE_HOST_URL", &self.pinecone_host_url);
            }
            VectorBackend::SurrealDb => require("SURREALDB_ADDRESS", &self.surrealdb_address),
        }

        if role == ServiceRole::Ingest && self.acquisition_backend == AcquisitionBackend::Firecrawl
        {
            require("FIRECRAWL_API_KEY", &self.firecrawl_api_key);
        }

        missing.dedup();
        if !missing.is_empty() {
            return Err(ConfigError::Message(format!(
                "Missing environment variable(s): {}",
                missing.join(", ")
            )));
        }

        if self.index_namespace.trim().is_empty() {
            return Err(ConfigError::Message(
                "index_namespace must not be empty".to_string(),
            ));
        }

        if self.ingest_chunking == ChunkingMode::Split
            && (self.ingest_chunk_min_chars == 0
                || self.ingest_chunk_min_chars > self.ingest_chunk_max_chars)
        {
            return Err(ConfigError::Message(
                "invalid chunk bounds; ensure 0 < ingest_chunk_min_chars <= ingest_chunk_max_chars"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Keys whose environment value is a comma-separated list.
const LIST_KEYS: [&str; 2] = ["guardrail_sensitive_phrases", "guardrail_toxic_terms"];

fn environment() -> Environment {
    LIST_KEYS.into_iter().fold(
        Environment::default().try_parsing(true).list_separator(","),
        Environment::with_list_parse_key,
    )
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(environment())
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> AppConfig {
        AppConfig {
            openai_api_key: "sk-test".into(),
            google_api_key: "google-test".into(),
            pinecone_api_key: "pc-test".into(),
            pinecone_host_url: "https://index.svc.pinecone.io".into(),
            firecrawl_api_key: "fc-test".into(),
            ..Default::default()
        }
    }

    #[test]
    fn complete_config_passes_both_roles() {
        let config = complete_config();
        assert!(config.validate_for(ServiceRole::Query).is_ok());
        assert!(config.validate_for(ServiceRole::Ingest).is_ok());
    }

    #[test]
    fn missing_credentials_are_all_reported() {
        let config = AppConfig::default();
        let err = config
            .validate_for(ServiceRole::Query)
            .expect_err("empty config must fail");
        let message = err.to_string();
        assert!(message.contains("OPENAI_API_KEY"));
        assert!(message.contains("GOOGLE_API_KEY"));
        assert!(message.contains("PINECONE_API_KEY"));
        assert!(message.contains("PINECONE_HOST_URL"));
    }

    #[test]
    fn ingest_role_does_not_need_generation_key() {
        let config = AppConfig {
            openai_api_key: String::new(),
            ..complete_config()
        };
        assert!(config.validate_for(ServiceRole::Ingest).is_ok());
        assert!(config.validate_for(ServiceRole::Query).is_err());
    }

    #[test]
    fn ingest_role_requires_firecrawl_key_only_for_firecrawl() {
        let mut config = AppConfig {
            firecrawl_api_key: String::new(),
            ..complete_config()
        };
        assert!(config.validate_for(ServiceRole::Ingest).is_err());

        config.acquisition_backend = AcquisitionBackend::Readability;
        assert!(config.validate_for(ServiceRole::Ingest).is_ok());
    }

    #[test]
    fn surreal_backend_requires_address_instead_of_pinecone() {
        let config = AppConfig {
            vector_backend: VectorBackend::SurrealDb,
            pinecone_api_key: String::new(),
            pinecone_host_url: String::new(),
            surrealdb_address: "mem://".into(),
            ..complete_config()
        };
        assert!(config.validate_for(ServiceRole::Query).is_ok());
    }

    #[test]
    fn guardrail_lists_load_from_comma_separated_env() {
        std::env::set_var("GUARDRAIL_SENSITIVE_PHRASES", "wire transfer,ssn");
        std::env::set_var("GUARDRAIL_TOXIC_TERMS", "dimwit");
        let loaded = get_config();
        std::env::remove_var("GUARDRAIL_SENSITIVE_PHRASES");
        std::env::remove_var("GUARDRAIL_TOXIC_TERMS");

        let config = loaded.expect("list-valued env vars must parse");
        assert_eq!(
            config.guardrail_sensitive_phrases,
            Some(vec!["wire transfer".to_string(), "ssn".to_string()])
        );
        assert_eq!(config.guardrail_toxic_terms, Some(vec!["dimwit".to_string()]));
    }

    #[test]
    fn split_chunking_rejects_inverted_bounds() {
        let config = AppConfig {
            ingest_chunking: ChunkingMode::Split,
            ingest_chunk_min_chars: 900,
            ingest_chunk_max_chars: 100,
            ..complete_config()
        };
        assert!(config.validate_for(ServiceRole::Ingest).is_err());
    }
}
