use anyhow::Context;

use bookstore_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before logging, so `.env` can set RUST_LOG and LOG_FORMAT.
    let _ = dotenv::dotenv();
    bookstore_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = bookstore_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
