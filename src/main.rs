use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrina::config::Config;
use vitrina::{App, Request, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let log_level = if config.debug() { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let server = Server::bind(config.bind_addr())
        .await?
        .max_request_size(config.max_content_length);
    info!(
        environment = %config.app_env,
        debug = config.debug(),
        "starting vitrina"
    );

    let app = Arc::new(App::new(config));
    server
        .run_until(
            move |request: Request| {
                let app = Arc::clone(&app);
                async move { app.handle(request).await }
            },
            async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
            },
        )
        .await?;

    info!("server stopped");
    Ok(())
}
