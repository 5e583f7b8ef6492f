pub mod answer_retrieval;
pub mod context_assembly;
pub mod guardrail;
pub mod pipeline;
pub mod single_flight;

pub use answer_retrieval::Answer;
pub use guardrail::{GuardrailFilter, GuardrailVerdict};
pub use pipeline::{
    AskOutcome, QueryError, QueryPipeline, QueryServices, QueryStage, RetrievalConfig,
    RetrievalTuning,
};
