use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{ask::ask, liveness::live, readiness::ready};

pub mod api_state;
pub mod error;
mod routes;

/// Router for the question endpoint plus probes.
pub fn api_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    Router::new().route("/ask", post(ask)).merge(probes)
}
