use std::sync::Arc;

use currents_news_mcp::{
    build_app,
    config::Config,
    currents_client::CurrentsClient,
    domain::{news::NewsService, reference::ReferenceCache},
    logging, AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    if !config.currents.has_api_key() {
        warn!("CURRENTS_API_KEY is not set; news tools will report AuthFailure until it is configured");
    }

    let client = Arc::new(CurrentsClient::new(&config.currents)?);
    let references = Arc::new(ReferenceCache::new(config.currents.enable_caching));
    let news = Arc::new(NewsService::new(client, references, config.currents.clone()));

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(config.api_token.clone(), news);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        default_language = %config.currents.default_language,
        caching_enabled = config.currents.enable_caching,
        "server starting"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
