use std::sync::Arc;

use common::{error::AppError, utils::config::AppConfig};
use retrieval_pipeline::QueryPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<QueryPipeline>,
}

impl ApiState {
    pub async fn new(config: &AppConfig) -> Result<Self, AppError> {
        let pipeline = QueryPipeline::from_config(config).await?;

        Ok(Self::with_pipeline(Arc::new(pipeline)))
    }

    pub fn with_pipeline(pipeline: Arc<QueryPipeline>) -> Self {
        Self { pipeline }
    }
}
