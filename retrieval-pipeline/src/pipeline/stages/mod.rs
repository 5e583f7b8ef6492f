use std::{future::Future, sync::Arc, time::Duration};

use common::{
    error::AppError,
    storage::{
        types::vector_query::{Match, QueryRequest},
        vector_index::VectorIndex,
    },
    utils::{embedding::Embedder, generation::AnswerGenerator},
};
use state_machines::core::GuardError;
use tracing::{debug, error, instrument, warn};

use crate::{
    answer_retrieval::{build_generation_request, Answer, FALLBACK_ANSWER},
    context_assembly::{assemble as assemble_context, context_sources},
    guardrail::{GuardrailFilter, GuardrailVerdict},
};

use super::{
    config::RetrievalTuning,
    error::{QueryError, QueryStage},
    state::{Assembled, Done, Embedded, Filtered, Generated, QueryMachine, Received, Retrieved},
};

/// The three providers a query talks to.
#[derive(Clone)]
pub struct QueryServices {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub generator: Arc<dyn AnswerGenerator>,
}

impl QueryServices {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
        }
    }
}

pub struct PipelineContext<'a> {
    pub services: &'a QueryServices,
    pub tuning: &'a RetrievalTuning,
    pub question: &'a str,
    pub query_embedding: Option<Vec<f32>>,
    pub matches: Vec<Match>,
    pub context: Option<String>,
    pub sources: Vec<String>,
    pub answer: Option<String>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(services: &'a QueryServices, tuning: &'a RetrievalTuning, question: &'a str) -> Self {
        Self {
            services,
            tuning,
            question,
            query_embedding: None,
            matches: Vec::new(),
            context: None,
            sources: Vec::new(),
            answer: None,
        }
    }

    fn missing(stage: QueryStage, what: &str) -> QueryError {
        QueryError::Internal {
            stage,
            detail: format!("{what} expected to be available"),
        }
    }

    pub fn abort(&self, err: QueryError) -> QueryError {
        abort(err)
    }
}

/// Logs a server-side failure once, where it happens. Callers further up only map it.
pub fn abort(err: QueryError) -> QueryError {
    error!(
        stage = %err.stage(),
        error = %err,
        "query pipeline aborted"
    );
    err
}

/// Rejects blank questions. Returns the trimmed question.
pub fn receive(question: &str) -> Result<&str, QueryError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(QueryError::InvalidInput("Missing question".into()));
    }
    Ok(trimmed)
}

#[instrument(level = "trace", skip_all)]
pub fn filter(
    machine: QueryMachine<(), Received>,
    guardrail: &GuardrailFilter,
    question: &str,
) -> Result<(QueryMachine<(), Filtered>, GuardrailVerdict), QueryError> {
    let verdict = guardrail.check(question);

    match &verdict {
        GuardrailVerdict::Allowed => {}
        GuardrailVerdict::BlockedSensitive(term) | GuardrailVerdict::BlockedToxic(term) => {
            warn!(
                category = verdict.category(),
                matched = %term,
                question,
                "question blocked by guardrail"
            );
        }
    }

    let machine = machine
        .filter()
        .map_err(|(_, guard)| map_guard_error(QueryStage::Filter, "filter", &guard))?;
    Ok((machine, verdict))
}

#[instrument(level = "trace", skip_all)]
pub async fn embed(
    machine: QueryMachine<(), Filtered>,
    ctx: &mut PipelineContext<'_>,
) -> Result<QueryMachine<(), Embedded>, QueryError> {
    let embedder = &ctx.services.embedder;
    let vector = within(ctx.tuning.stage_timeout, embedder.embed(ctx.question))
        .await
        .map_err(|err| QueryError::Embedding(err.to_string()))?;

    if vector.is_empty() {
        return Err(QueryError::Embedding(
            "provider returned an empty vector".into(),
        ));
    }
    if let Some(expected) = embedder.dimension() {
        if vector.len() != expected {
            return Err(QueryError::Embedding(format!(
                "expected {expected} dimensions, got {}",
                vector.len()
            )));
        }
    }

    debug!(dimensions = vector.len(), "question embedded");
    ctx.query_embedding = Some(vector);

    machine
        .embed()
        .map_err(|(_, guard)| map_guard_error(QueryStage::Embed, "embed", &guard))
}

#[instrument(level = "trace", skip_all)]
pub async fn retrieve(
    machine: QueryMachine<(), Embedded>,
    ctx: &mut PipelineContext<'_>,
) -> Result<QueryMachine<(), Retrieved>, QueryError> {
    let vector = ctx
        .query_embedding
        .take()
        .ok_or_else(|| PipelineContext::missing(QueryStage::Retrieve, "query embedding"))?;

    let request = QueryRequest {
        vector,
        top_k: ctx.tuning.top_k,
        include_metadata: true,
        namespace: ctx.tuning.namespace.clone(),
    };

    let response = within(ctx.tuning.stage_timeout, ctx.services.index.query(request))
        .await
        .map_err(|err| QueryError::Retrieval(err.to_string()))?;

    debug!(
        matches = response.matches.len(),
        top_score = response.matches.first().map(|m| m.score),
        "matches retrieved"
    );
    ctx.matches = response.matches;

    machine
        .retrieve()
        .map_err(|(_, guard)| map_guard_error(QueryStage::Retrieve, "retrieve", &guard))
}

#[instrument(level = "trace", skip_all)]
pub fn assemble(
    machine: QueryMachine<(), Retrieved>,
    ctx: &mut PipelineContext<'_>,
) -> Result<QueryMachine<(), Assembled>, QueryError> {
    let tuning = ctx.tuning;
    let context = assemble_context(&ctx.matches, tuning.max_matches, tuning.max_chars_per_chunk);
    ctx.sources = context_sources(&ctx.matches, tuning.max_matches);

    debug!(
        context_chars = context.chars().count(),
        sources = ctx.sources.len(),
        "context assembled"
    );
    ctx.context = Some(context);

    machine
        .assemble()
        .map_err(|(_, guard)| map_guard_error(QueryStage::Assemble, "assemble", &guard))
}

#[instrument(level = "trace", skip_all)]
pub async fn generate(
    machine: QueryMachine<(), Assembled>,
    ctx: &mut PipelineContext<'_>,
) -> Result<QueryMachine<(), Generated>, QueryError> {
    let context = ctx
        .context
        .as_deref()
        .ok_or_else(|| PipelineContext::missing(QueryStage::Generate, "assembled context"))?;
    let request = build_generation_request(context, ctx.question, ctx.tuning.temperature);

    let reply = within(
        ctx.tuning.stage_timeout,
        ctx.services.generator.generate(request),
    )
    .await
    .map_err(|err| QueryError::Generation(err.to_string()))?;

    let answer = reply.unwrap_or_else(|| {
        warn!("generator returned no content; using fallback answer");
        FALLBACK_ANSWER.to_string()
    });
    ctx.answer = Some(answer);

    machine
        .generate()
        .map_err(|(_, guard)| map_guard_error(QueryStage::Generate, "generate", &guard))
}

pub fn finish(
    machine: QueryMachine<(), Generated>,
    ctx: &mut PipelineContext<'_>,
) -> Result<(QueryMachine<(), Done>, Answer), QueryError> {
    let content = ctx
        .answer
        .take()
        .ok_or_else(|| PipelineContext::missing(QueryStage::Generate, "answer"))?;
    let answer = Answer {
        content,
        sources: std::mem::take(&mut ctx.sources),
    };

    let machine = machine
        .finish()
        .map_err(|(_, guard)| map_guard_error(QueryStage::Generate, "finish", &guard))?;
    Ok((machine, answer))
}

async fn within<T, F>(limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, call).await.map_err(|_| {
        AppError::Timeout(format!("no reply within {} ms", limit.as_millis()))
    })?
}

pub(super) fn map_guard_error(stage: QueryStage, event: &str, guard: &GuardError) -> QueryError {
    QueryError::Internal {
        stage,
        detail: format!("invalid query pipeline transition during {event}: {guard:?}"),
    }
}
