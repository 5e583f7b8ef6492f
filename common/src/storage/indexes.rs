use tracing::debug;

use crate::{error::AppError, storage::db::SurrealDbClient};

pub const VECTOR_TABLE: &str = "vector_chunk";

/// Defines the vector table and its lookup index. Idempotent.
pub async fn ensure_runtime_indexes(db: &SurrealDbClient) -> Result<(), AppError> {
    db.client
        .query(format!(
            "DEFINE TABLE IF NOT EXISTS {VECTOR_TABLE} SCHEMALESS;
             DEFINE INDEX IF NOT EXISTS idx_{VECTOR_TABLE}_namespace ON TABLE {VECTOR_TABLE} FIELDS namespace;"
        ))
        .await?
        .check()?;

    debug!(table = VECTOR_TABLE, "vector table ready");
    Ok(())
}
