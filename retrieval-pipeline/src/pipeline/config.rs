use std::time::Duration;

use common::utils::config::AppConfig;

/// Tunable parameters for one query. `top_k` and `max_matches` are independent:
/// the index is asked for `top_k` matches and the context uses at most `max_matches`.
#[derive(Debug, Clone)]
pub struct RetrievalTuning {
    pub top_k: usize,
    pub max_matches: usize,
    pub max_chars_per_chunk: usize,
    pub namespace: String,
    pub temperature: f32,
    pub stage_timeout: Duration,
}

impl Default for RetrievalTuning {
    fn default() -> Self {
        Self {
            top_k: 10,
            max_matches: 8,
            max_chars_per_chunk: 500,
            namespace: "default".to_string(),
            temperature: 0.7,
            stage_timeout: Duration::from_secs(30),
        }
    }
}

/// Wrapper containing tuning plus per-process flags.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub tuning: RetrievalTuning,
    pub dedupe_inflight: bool,
}

impl RetrievalConfig {
    pub fn new(tuning: RetrievalTuning) -> Self {
        Self {
            tuning,
            dedupe_inflight: true,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            tuning: RetrievalTuning {
                namespace: config.index_namespace.clone(),
                temperature: config.generation_temperature,
                stage_timeout: stage_budget(config),
                ..RetrievalTuning::default()
            },
            dedupe_inflight: config.dedupe_inflight,
        }
    }
}

/// Room for every retry attempt of one provider call.
fn stage_budget(config: &AppConfig) -> Duration {
    let attempts = u32::try_from(config.retry_attempts.max(1)).unwrap_or(u32::MAX);
    Duration::from_secs(config.request_timeout_secs.max(1)).saturating_mul(attempts)
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::new(RetrievalTuning::default())
    }
}
