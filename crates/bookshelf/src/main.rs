use bookshelf::{config::AppConfig, run_app};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting bookshelf ({} backend)",
        if config.database.is_some() {
            "postgres"
        } else {
            "memory"
        }
    );

    run_app(config).await
}
