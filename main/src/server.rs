use api_router::{api_routes, api_state::ApiState};
use axum::Router;
use common::utils::config::{get_config, ServiceRole};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config and fail fast on missing credentials
    let config = get_config()?;
    config.validate_for(ServiceRole::Query)?;
    info!(
        embedding_backend = ?config.embedding_backend,
        vector_backend = ?config.vector_backend,
        namespace = %config.index_namespace,
        "configuration loaded"
    );

    let api_state = ApiState::new(&config).await?;

    let app: Router = api_routes().with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
