mod config;
mod context;
mod error;
mod services;
mod stages;
mod state;

pub use config::{IngestionConfig, IngestionTuning};
pub use error::{IngestError, IngestStage};
#[allow(clippy::module_name_repetitions)]
pub use services::IngestionServices;

use std::time::{Duration, Instant};

use common::{error::AppError, utils::config::AppConfig};
use tracing::info;

use crate::types::IngestInput;

use self::{
    context::PipelineContext,
    stages::{acquire, chunk, embed, persist},
    state::ready,
};

#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    pipeline_config: IngestionConfig,
    services: IngestionServices,
}

impl IngestionPipeline {
    pub fn with_services(pipeline_config: IngestionConfig, services: IngestionServices) -> Self {
        Self {
            pipeline_config,
            services,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::with_services(
            IngestionConfig::from_app_config(config),
            IngestionServices::from_config(config).await?,
        ))
    }

    pub fn tuning(&self) -> &IngestionTuning {
        &self.pipeline_config.tuning
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Acquires, chunks, embeds and upserts one input. Returns the upserted ids.
    ///
    /// Records are keyed by stable ids, so re-running an input overwrites it.
    #[tracing::instrument(skip_all, fields(source = input.label()))]
    pub async fn ingest(&self, input: &IngestInput) -> Result<Vec<String>, IngestError> {
        let mut ctx = PipelineContext::new(input, &self.pipeline_config, &self.services);

        let machine = ready();

        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = acquire(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let acquire_duration = stage_start.elapsed();

        let machine = chunk(machine, &mut ctx).map_err(|err| ctx.abort(err))?;

        let stage_start = Instant::now();
        let machine = embed(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let embed_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let (_machine, ids) = persist(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let persist_duration = stage_start.elapsed();

        info!(
            total_ms = Self::duration_millis(pipeline_started.elapsed()),
            acquire_ms = Self::duration_millis(acquire_duration),
            embed_ms = Self::duration_millis(embed_duration),
            persist_ms = Self::duration_millis(persist_duration),
            records = ids.len(),
            "ingestion pipeline finished"
        );

        Ok(ids)
    }
}

#[cfg(test)]
mod tests;
