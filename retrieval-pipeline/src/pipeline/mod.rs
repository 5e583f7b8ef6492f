mod config;
mod error;
mod stages;
mod state;

pub use config::{RetrievalConfig, RetrievalTuning};
pub use error::{QueryError, QueryStage};
pub use stages::QueryServices;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::vector_index::vector_index_from_config,
    utils::{config::AppConfig, embedding::EmbeddingProvider, generation::OpenAIGenerator},
};
use tracing::{debug, info};

use crate::{
    answer_retrieval::{Answer, FALLBACK_ANSWER},
    guardrail::{GuardrailFilter, GuardrailVerdict},
    single_flight::SingleFlight,
};

use self::{
    stages::{map_guard_error, PipelineContext},
    state::{ready, Filtered, QueryMachine},
};

/// Result of a handled question: either an answer or a guardrail refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Answered(Answer),
    Blocked(GuardrailVerdict),
}

impl AskOutcome {
    /// Text to hand back to the asker.
    pub fn into_text(self) -> String {
        match self {
            Self::Answered(answer) => answer.content,
            Self::Blocked(verdict) => verdict
                .canned_message()
                .unwrap_or(FALLBACK_ANSWER)
                .to_string(),
        }
    }
}

struct PipelineInner {
    services: QueryServices,
    guardrail: GuardrailFilter,
    config: RetrievalConfig,
}

#[allow(clippy::module_name_repetitions)]
pub struct QueryPipeline {
    inner: Arc<PipelineInner>,
    flights: Option<SingleFlight<Result<Answer, QueryError>>>,
}

impl QueryPipeline {
    pub fn with_services(
        guardrail: GuardrailFilter,
        config: RetrievalConfig,
        services: QueryServices,
    ) -> Self {
        let flights = config.dedupe_inflight.then(SingleFlight::default);
        Self {
            inner: Arc::new(PipelineInner {
                services,
                guardrail,
                config,
            }),
            flights,
        }
    }

    /// Builds every provider client from a validated config.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let services = QueryServices::new(
            Arc::new(EmbeddingProvider::from_config(config)?),
            vector_index_from_config(config).await?,
            Arc::new(OpenAIGenerator::from_config(config)?),
        );

        Ok(Self::with_services(
            GuardrailFilter::from_config(config),
            RetrievalConfig::from_app_config(config),
            services,
        ))
    }

    pub fn services(&self) -> &QueryServices {
        &self.inner.services
    }

    pub fn tuning(&self) -> &RetrievalTuning {
        &self.inner.config.tuning
    }

    /// Answers one question.
    ///
    /// Validation and the guardrail run for every call. A blocked question
    /// returns before any provider is contacted.
    #[tracing::instrument(skip_all, fields(question_chars = question.chars().count()))]
    pub async fn answer(&self, question: &str) -> Result<AskOutcome, QueryError> {
        let machine = ready();
        let question = stages::receive(question)?;

        let (machine, verdict) =
            stages::filter(machine, &self.inner.guardrail, question).map_err(stages::abort)?;
        if verdict.is_blocked() {
            let _machine = machine.block().map_err(|(_, guard)| {
                stages::abort(map_guard_error(QueryStage::Filter, "block", &guard))
            })?;
            return Ok(AskOutcome::Blocked(verdict));
        }

        let owned_question = question.to_string();
        let inner = Arc::clone(&self.inner);
        let answer = match &self.flights {
            None => drive_pipeline(inner, machine, owned_question).await,
            Some(flights) => {
                let (result, leader) = flights
                    .run(normalize_question(question), move || {
                        drive_pipeline(inner, machine, owned_question)
                    })
                    .await;
                if !leader {
                    debug!("joined in-flight execution for identical question");
                }
                result.unwrap_or_else(|aborted| {
                    Err(stages::abort(QueryError::Internal {
                        stage: QueryStage::Embed,
                        detail: aborted.to_string(),
                    }))
                })
            }
        }?;

        Ok(AskOutcome::Answered(answer))
    }
}

/// Key under which identical questions are coalesced.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn drive_pipeline(
    inner: Arc<PipelineInner>,
    machine: QueryMachine<(), Filtered>,
    question: String,
) -> Result<Answer, QueryError> {
    let mut ctx = PipelineContext::new(&inner.services, &inner.config.tuning, &question);

    let pipeline_started = Instant::now();

    let stage_start = Instant::now();
    let machine = stages::embed(machine, &mut ctx)
        .await
        .map_err(|err| ctx.abort(err))?;
    let embed_duration = stage_start.elapsed();

    let stage_start = Instant::now();
    let machine = stages::retrieve(machine, &mut ctx)
        .await
        .map_err(|err| ctx.abort(err))?;
    let retrieve_duration = stage_start.elapsed();

    let machine = stages::assemble(machine, &mut ctx).map_err(|err| ctx.abort(err))?;

    let stage_start = Instant::now();
    let machine = stages::generate(machine, &mut ctx)
        .await
        .map_err(|err| ctx.abort(err))?;
    let generate_duration = stage_start.elapsed();

    let (_machine, answer) = stages::finish(machine, &mut ctx).map_err(|err| ctx.abort(err))?;

    info!(
        total_ms = duration_millis(pipeline_started.elapsed()),
        embed_ms = duration_millis(embed_duration),
        retrieve_ms = duration_millis(retrieve_duration),
        generate_ms = duration_millis(generate_duration),
        sources = answer.sources.len(),
        "query pipeline finished"
    );

    Ok(answer)
}
