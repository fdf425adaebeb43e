use eventhub_server::{api::app_router, build_state, config::Config, init_tracing, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    let state = build_state(&config).await?;

    scheduler::start_catalog_sync_scheduler(state.clone(), config.catalog_sync_interval);
    scheduler::start_revocation_purge(state.clone());

    let router = app_router(state, &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
