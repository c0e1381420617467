use anyhow::Context;
use interview_api::{AppState, create_router};
use interview_service::WizardFactory;
use tracing::info;
use std::time::Duration;
use tracing_subscriber::fmt::time::ChronoLocal;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let service_config = interview_service::Config::from_env()
        .context("Failed to load application configuration")?;
    let api_config =
        interview_api::config::Config::from_env().context("Failed to load API configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(service_config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let factory = WizardFactory::from_config(&service_config)?;
    let state = AppState::new(factory, api_config.session_idle_timeout);

    // Sweep abandoned sessions in the background as well as on creation.
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweeper.prune_idle();
            if removed > 0 {
                info!("Expired {} idle session(s)", removed);
            }
        }
    });

    let app = create_router(state);

    info!("Starting interview API, listening on {}", api_config.bind_address);
    let listener = tokio::net::TcpListener::bind(api_config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
