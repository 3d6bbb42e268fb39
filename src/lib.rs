pub mod api; // HTTP API: upload, analysis, questions
pub mod config;
pub mod core_state; // Shared state: pipeline, assistant, sessions
pub mod pipeline;
pub mod chat; // Report sessions + question history

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Errors that stop the service before or while it serves.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("State initialization failed: {0}")]
    Core(#[from] core_state::CoreError),
}

pub fn run() -> Result<(), StartupError> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::Settings::from_env();
    if settings.api_key.is_none() {
        tracing::warn!("GROQ_API_KEY is not set; completion requests will be unauthenticated");
    }
    tracing::info!(
        api_base = %settings.api_base,
        analysis_model = %settings.analysis_model,
        chat_model = %settings.chat_model,
        "Completion service configured"
    );

    // The blocking HTTP client must be built and dropped outside the runtime.
    let bind = settings.bind;
    let core = Arc::new(core_state::CoreState::new(settings)?);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(core.clone(), bind))
}

async fn serve(core: Arc<core_state::CoreState>, bind: SocketAddr) -> Result<(), StartupError> {
    let server = api::start_api_server(core, bind).await?;

    tracing::info!(addr = %server.local_addr(), "Listening; press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }

    server.shutdown().await;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
