use std::sync::Arc;

use anyhow::Context as _;
use pagedata::app::PageApp;
use pagedata::config::Config;
use pagedata::server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagedata=info")),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let app = PageApp::from_config(&config);
    info!(
        pages = app.loaders().len(),
        status_policy = ?config.status_policy,
        cache_header_style = ?config.cache_header_style,
        leaderboard_ttl = ?config.leaderboard_ttl,
        "page loaders ready"
    );

    let router = Arc::new(app.router());
    let server = Server::bind(&config.bind_addr).await?;
    server
        .run_until(
            move |req| {
                let router = Arc::clone(&router);
                async move { router.route(req).await }
            },
            async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
            },
        )
        .await?;

    Ok(())
}
