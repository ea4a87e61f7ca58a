use anyhow::Context;

use shopkeeper_infra::ShopkeeperConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment alone may configure us.
    let _ = dotenvy::dotenv();
    shopkeeper_observability::init();

    let config = ShopkeeperConfig::from_env().context("invalid configuration")?;
    let bind_addr = config.bind_addr.clone();

    let app = shopkeeper_api::app::build_app(config).context("failed to install reference data")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
