use anyhow::{Context, Result};
use pagechat::{
    api::{self, AppState},
    config,
    context::ContextSettings,
    generation::GeminiClient,
    logging,
    pipeline::AnswerPipeline,
    storage::InMemoryStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let config = config::load_config().context("failed to load configuration")?;

    let backend = GeminiClient::from_config(&config).context("failed to build Gemini client")?;
    let settings = ContextSettings::new(config.context_chunk_size, config.context_top_k)
        .context("invalid context settings")?;
    let pipeline = Arc::new(AnswerPipeline::new(Arc::new(backend), settings));
    let app = api::create_router(AppState::new(Arc::new(InMemoryStore::new()), pipeline));

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(server_port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
